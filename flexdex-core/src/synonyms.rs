//! Synonym table for capability search
//!
//! Maps a query term to the set of terms that should also count as a match.
//! Has no effect on the entity graph.

use std::collections::{BTreeMap, BTreeSet};

/// Built-in operation vocabulary.
const BUILTIN: &[(&str, &[&str])] = &[
    ("add", &["set", "create", "insert", "append"]),
    ("set", &["add", "update", "modify", "assign"]),
    ("get", &["fetch", "retrieve", "find", "read"]),
    ("delete", &["remove", "clear", "erase"]),
    ("remove", &["delete", "clear"]),
    ("create", &["add", "new", "make"]),
    ("update", &["set", "modify", "change"]),
    ("find", &["search", "get", "lookup", "query"]),
    ("list", &["getall", "all", "iterate", "enumerate"]),
];

/// Term -> related terms. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl SynonymTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in operation vocabulary
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (term, synonyms) in BUILTIN {
            table.insert(term, synonyms.iter().copied());
        }
        table
    }

    /// Add synonyms for a term, merging with any existing entry.
    pub fn insert<'a>(&mut self, term: &str, synonyms: impl IntoIterator<Item = &'a str>) {
        let key = term.to_lowercase();
        let set = self.entries.entry(key.clone()).or_default();
        for synonym in synonyms {
            let synonym = synonym.to_lowercase();
            if synonym != key && !synonym.is_empty() {
                set.insert(synonym);
            }
        }
    }

    /// Synonyms of a term (never includes the term itself)
    pub fn synonyms_of(&self, term: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(&term.to_lowercase())
    }

    /// Expand literal terms with their synonyms.
    ///
    /// Returns the literal terms (deduplicated, in first-seen order) and the
    /// synonym-only terms (sorted, excluding anything already literal).
    pub fn expand(&self, terms: &[String]) -> (Vec<String>, Vec<String>) {
        let mut literal: Vec<String> = Vec::new();
        for term in terms {
            if !literal.contains(term) {
                literal.push(term.clone());
            }
        }

        let mut extra = BTreeSet::new();
        for term in &literal {
            if let Some(synonyms) = self.entries.get(term) {
                for synonym in synonyms {
                    if !literal.contains(synonym) {
                        extra.insert(synonym.clone());
                    }
                }
            }
        }

        (literal, extra.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
