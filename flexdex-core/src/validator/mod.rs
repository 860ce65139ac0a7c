//! Script validator
//!
//! Checks identifier usage in a generated snippet against the index at one
//! tier. Receiver types are inferred locally, statement by statement, from
//! entity names, earlier bindings, member return types, relationship access
//! patterns and `getX()`-style factory calls. Purely static: nothing in the
//! snippet is executed.

mod report;
mod scan;

pub use report::{Diagnostic, DiagnosticKind, Suggestion, ValidationReport};

use crate::config::ValidatorConfig;
use crate::model::{Cardinality, EntityIdx, Member, Tier};
use crate::snapshot::Snapshot;
use scan::{BindingKind, Chain, Segment, Statement};
use std::collections::HashMap;

/// Validate `snippet` against the snapshot at `tier`.
pub fn validate(
    snapshot: &Snapshot,
    snippet: &str,
    tier: Tier,
    config: &ValidatorConfig,
) -> ValidationReport {
    let statements = scan::scan(snippet);
    let mut checker = Checker {
        snapshot,
        tier,
        config,
        vars: HashMap::new(),
        report: ValidationReport::new(tier),
    };
    for statement in &statements {
        checker.statement(statement);
    }
    checker.report.statements = statements.len();

    log::debug!(
        "validated {} statements at {}: {} errors, {} warnings",
        statements.len(),
        tier,
        checker.report.errors.len(),
        checker.report.warnings.len()
    );
    checker.report
}

/// Inferred type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ty {
    Entity(EntityIdx),
    Collection(EntityIdx),
    Unknown,
}

impl Ty {
    fn element(self) -> Ty {
        match self {
            Ty::Collection(idx) => Ty::Entity(idx),
            other => other,
        }
    }

    fn collection(self) -> Ty {
        match self {
            Ty::Entity(idx) | Ty::Collection(idx) => Ty::Collection(idx),
            Ty::Unknown => Ty::Unknown,
        }
    }
}

/// Outcome of resolving the next segment(s) of a chain on a known entity
enum Step {
    Resolved { ty: Ty, consumed: usize },
    Failed,
}

struct Checker<'a> {
    snapshot: &'a Snapshot,
    tier: Tier,
    config: &'a ValidatorConfig,
    vars: HashMap<String, Ty>,
    report: ValidationReport,
}

impl Checker<'_> {
    fn statement(&mut self, statement: &Statement) {
        let mut bound = None;
        for chain in &statement.chains {
            let ty = self.chain(statement.line, chain);
            if let Some(binding) = &statement.binding {
                if chain.start == binding.expr_start {
                    bound = Some(ty);
                }
            }
        }

        if let Some(binding) = &statement.binding {
            let ty = bound.unwrap_or(Ty::Unknown);
            let ty = match binding.kind {
                BindingKind::Assign => ty,
                BindingKind::Loop => ty.element(),
            };
            self.vars.insert(binding.var.clone(), ty);
        }
    }

    fn chain(&mut self, line: usize, chain: &Chain) -> Ty {
        let segments = &chain.segments;
        let root = chain.root();
        let mut ty = self.root_type(root);
        if root.indexed {
            ty = ty.element();
        }

        let mut i = 1;
        while i < segments.len() {
            let Ty::Entity(entity) = ty else {
                self.partial(line, chain, i, ty);
                return Ty::Unknown;
            };
            match self.step(line, entity, &segments[i..]) {
                Step::Resolved { ty: next, consumed } => {
                    i += consumed;
                    ty = if segments[i - 1].indexed {
                        next.element()
                    } else {
                        next
                    };
                }
                Step::Failed => return Ty::Unknown,
            }
        }
        ty
    }

    fn root_type(&self, root: &Segment) -> Ty {
        if let Some(ty) = self.vars.get(&root.name) {
            return if root.call { Ty::Unknown } else { *ty };
        }
        if root.call {
            if let Some(idx) = self.factory(&root.name) {
                return Ty::Entity(idx);
            }
        }
        // Unbound lowercase names are usually parameters or plain locals
        self.snapshot
            .named_idx(&root.name)
            .map_or(Ty::Unknown, Ty::Entity)
    }

    /// `getEntry` / `GetEntry` / `createEntry` / `newEntry` -> Entry
    fn factory(&self, name: &str) -> Option<EntityIdx> {
        const PREFIXES: &[&str] = &["get", "Get", "create", "Create", "new", "New"];
        PREFIXES.iter().find_map(|prefix| {
            let rest = name.strip_prefix(prefix)?;
            if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
                return None;
            }
            self.snapshot.resolve_idx(rest)
        })
    }

    /// Wrapper accessors such as `project.LexEntry` or `project.Senses`
    fn accessor(&self, name: &str) -> Option<EntityIdx> {
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return None;
        }
        self.snapshot
            .resolve_idx(name)
            .or_else(|| {
                name.strip_suffix("ies")
                    .and_then(|stem| self.snapshot.resolve_idx(&format!("{stem}y")))
            })
            .or_else(|| {
                name.strip_suffix('s')
                    .and_then(|stem| self.snapshot.resolve_idx(stem))
            })
    }

    fn step(&mut self, line: usize, entity: EntityIdx, rest: &[Segment]) -> Step {
        let snapshot = self.snapshot;
        let owner = snapshot.entity_at(entity);
        let name = rest[0].name.as_str();

        let named: Vec<&Member> = owner
            .members
            .iter()
            .map(|&idx| snapshot.member_at(idx))
            .filter(|m| m.name == name)
            .collect();
        if let Some(first) = named.first() {
            if let Some(available) = named.iter().find(|m| m.available_at(self.tier)) {
                return Step::Resolved {
                    ty: self.member_type(available),
                    consumed: 1,
                };
            }
            self.tier_unavailable(line, &owner.id, &named);
            return Step::Resolved {
                ty: self.member_type(first),
                consumed: 1,
            };
        }

        if let Some((ty, consumed)) = self.edge_access(entity, rest) {
            return Step::Resolved { ty, consumed };
        }

        if let Some(idx) = self.accessor(name) {
            return Step::Resolved {
                ty: Ty::Entity(idx),
                consumed: 1,
            };
        }

        self.unknown_member(line, entity, name);
        Step::Failed
    }

    /// Match the chain against access patterns of edges leaving `entity`
    fn edge_access(&self, entity: EntityIdx, rest: &[Segment]) -> Option<(Ty, usize)> {
        let snapshot = self.snapshot;
        for &edge in &snapshot.entity_at(entity).edges {
            let (from, to) = snapshot.edge_endpoints(edge);
            if from != entity {
                continue;
            }
            let relationship = snapshot.edge_at(edge);
            let pattern: Vec<&str> = relationship
                .access
                .split('.')
                .skip(1)
                .map(|s| s.trim().trim_end_matches("()"))
                .collect();
            if pattern.is_empty() || pattern.len() > rest.len() {
                continue;
            }
            if pattern.iter().zip(rest).all(|(p, s)| *p == s.name) {
                let ty = match relationship.cardinality {
                    Cardinality::One => Ty::Entity(to),
                    Cardinality::Many => Ty::Collection(to),
                };
                return Some((ty, pattern.len()));
            }
        }
        None
    }

    fn member_type(&self, member: &Member) -> Ty {
        member
            .return_type
            .as_deref()
            .map_or(Ty::Unknown, |tag| self.type_of_tag(tag))
    }

    /// `ILexSense` -> entity, `ILexSense[]` / `List[ILexSense]` /
    /// `IEnumerable<ILexSense>` -> collection, anything else unknown
    fn type_of_tag(&self, tag: &str) -> Ty {
        let tag = tag.trim();
        if let Some(inner) = tag.strip_suffix("[]") {
            return self.type_of_tag(inner).collection();
        }
        if let Some(open) = tag.find(['<', '[']) {
            if tag.ends_with(['>', ']']) && open + 1 < tag.len() - 1 {
                let inner = &tag[open + 1..tag.len() - 1];
                let element = inner.rsplit(',').next().unwrap_or(inner);
                return self.type_of_tag(element).collection();
            }
        }
        let bare = tag.rsplit('.').next().unwrap_or(tag);
        self.snapshot
            .resolve_idx(bare)
            .map_or(Ty::Unknown, Ty::Entity)
    }

    // ==========================================
    // Diagnostics
    // ==========================================

    fn partial(&mut self, line: usize, chain: &Chain, at: usize, ty: Ty) {
        let receiver: Vec<&str> = chain.segments[..at].iter().map(|s| s.name.as_str()).collect();
        let receiver = receiver.join(".");
        let identifier = chain.segments[at].name.clone();
        let message = match ty {
            Ty::Collection(idx) => format!(
                "`{receiver}` is a collection of {}; `{identifier}` was not checked",
                self.snapshot.entity_at(idx).name
            ),
            _ => format!("cannot infer the type of `{receiver}`; `{identifier}` was not checked"),
        };
        self.report.warnings.push(Diagnostic {
            kind: DiagnosticKind::PartialAnalysis,
            line,
            identifier,
            receiver: None,
            message,
            suggestion: None,
            available_at: Vec::new(),
        });
    }

    fn tier_unavailable(&mut self, line: usize, owner: &str, named: &[&Member]) {
        let name = named[0].name.clone();
        let available = self.available_in_fallback_order(named);
        let listed: Vec<&str> = available.iter().map(Tier::as_str).collect();

        let suggestion = self
            .counterpart_at_tier(named)
            .map(|counterpart| Suggestion {
                line,
                original: name.clone(),
                replacement: counterpart.name.clone(),
                tier: Some(self.tier),
                reason: format!(
                    "`{}` is the {} equivalent of `{}`",
                    counterpart.name, self.tier, name
                ),
            })
            .or_else(|| {
                available.first().map(|fallback| Suggestion {
                    line,
                    original: name.clone(),
                    replacement: name.clone(),
                    tier: Some(*fallback),
                    reason: format!("fall back to the {fallback} tier"),
                })
            });

        self.report.warnings.push(Diagnostic {
            kind: DiagnosticKind::TierUnavailable,
            line,
            identifier: name.clone(),
            receiver: Some(owner.to_string()),
            message: format!(
                "`{}` is not available at the {} tier; available at: {}",
                name,
                self.tier,
                listed.join(", ")
            ),
            suggestion: suggestion.as_ref().map(|s| s.replacement.clone()),
            available_at: available,
        });
        if let Some(suggestion) = suggestion {
            self.report.suggestions.push(suggestion);
        }
    }

    /// Tiers the members are available at, in the configured fallback order;
    /// tiers the order does not mention come last.
    fn available_in_fallback_order(&self, named: &[&Member]) -> Vec<Tier> {
        let available = |t: &Tier| named.iter().any(|m| m.available_at(*t));
        let mut tiers: Vec<Tier> = self
            .config
            .fallback_order
            .iter()
            .copied()
            .filter(available)
            .collect();
        for tier in Tier::ALL {
            if available(&tier) && !tiers.contains(&tier) {
                tiers.push(tier);
            }
        }
        tiers
    }

    /// A cross-mapped member at the requested tier
    fn counterpart_at_tier(&self, named: &[&Member]) -> Option<&Member> {
        self.snapshot.mappings().iter().find_map(|mapping| {
            let linked = mapping
                .slots()
                .any(|(_, id)| named.iter().any(|m| m.id == id));
            if !linked {
                return None;
            }
            let id = mapping.member_at(self.tier)?;
            self.snapshot.member(id).ok()
        })
    }

    fn unknown_member(&mut self, line: usize, entity: EntityIdx, name: &str) {
        let owner = self.snapshot.entity_at(entity);
        let nearest = self.nearest_member(entity, name);

        if let Some((candidate, score)) = &nearest {
            self.report.suggestions.push(Suggestion {
                line,
                original: name.to_string(),
                replacement: candidate.clone(),
                tier: None,
                reason: format!("closest member of {} (similarity {:.2})", owner.name, score),
            });
        }
        self.report.errors.push(Diagnostic {
            kind: DiagnosticKind::UnknownMember,
            line,
            identifier: name.to_string(),
            receiver: Some(owner.id.clone()),
            message: format!("`{}` has no member `{}`", owner.name, name),
            suggestion: nearest.map(|(candidate, _)| candidate),
            available_at: Vec::new(),
        });
    }

    /// Most similar member name at or above the threshold. Ties prefer
    /// members available at the requested tier, then the smaller name.
    fn nearest_member(&self, entity: EntityIdx, name: &str) -> Option<(String, f64)> {
        let wanted = name.to_lowercase();
        let mut best: Option<(f64, bool, &str)> = None;

        for &idx in &self.snapshot.entity_at(entity).members {
            let member = self.snapshot.member_at(idx);
            let score = strsim::normalized_levenshtein(&wanted, &member.name.to_lowercase());
            if score < self.config.suggestion_threshold {
                continue;
            }
            let candidate = (score, member.available_at(self.tier), member.name.as_str());
            let better = match best {
                None => true,
                Some((s, at_tier, n)) => {
                    score > s
                        || (score == s && candidate.1 && !at_tier)
                        || (score == s && candidate.1 == at_tier && candidate.2 < n)
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        best.map(|(score, _, name)| (name.to_string(), score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::lexicon_snapshot;
    use crate::records::RecordBatch;
    use serde_json::json;

    fn check(snapshot: &Snapshot, snippet: &str, tier: Tier) -> ValidationReport {
        validate(snapshot, snippet, tier, &ValidatorConfig::default())
    }

    fn gloss_only_index() -> Snapshot {
        let mut batch = RecordBatch::new();
        batch
            .add_document(
                "comprehensive.json",
                json!({
                    "tier": "comprehensive",
                    "entities": [{"id": "Entry", "name": "LexEntry"}],
                    "members": [{"id": "Entry.SetGloss", "entity": "Entry", "name": "SetGloss",
                                 "kind": "method", "signature": ["text"]}]
                }),
            )
            .unwrap();
        Snapshot::load(&batch).unwrap()
    }

    #[test]
    fn test_misspelled_member_suggests_nearest() {
        let snapshot = gloss_only_index();
        let report = check(&snapshot, "x = getEntry(); x.SetGlss(\"a\")", Tier::Comprehensive);

        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty());
        let error = &report.errors[0];
        assert_eq!(error.kind, DiagnosticKind::UnknownMember);
        assert_eq!(error.identifier, "SetGlss");
        assert_eq!(error.receiver.as_deref(), Some("Entry"));
        assert_eq!(error.suggestion.as_deref(), Some("SetGloss"));
        assert_eq!(report.suggestions[0].replacement, "SetGloss");
        assert!(!report.is_valid());
    }

    #[test]
    fn test_threshold_suppresses_weak_suggestion() {
        let snapshot = gloss_only_index();
        let config = ValidatorConfig {
            suggestion_threshold: 0.95,
            ..Default::default()
        };
        let report = validate(&snapshot, "x = getEntry(); x.SetGlss(\"a\")", Tier::Comprehensive, &config);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].suggestion, None);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_native_only_member_at_wrapper_tier_warns() {
        let snapshot = lexicon_snapshot();
        let report = check(
            &snapshot,
            "entry = getEntry()\nfor sense in entry.SensesOS:\n    print(sense)",
            Tier::Comprehensive,
        );

        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        let warning = &report.warnings[0];
        assert_eq!(warning.kind, DiagnosticKind::TierUnavailable);
        assert_eq!(warning.line, 2);
        assert_eq!(warning.available_at, vec![Tier::Native]);
        assert!(warning.message.contains("native"));
        assert_eq!(report.suggestions[0].tier, Some(Tier::Native));
    }

    #[test]
    fn test_mapped_counterpart_is_suggested() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "sense = getSense()\nsense.Gloss", Tier::Comprehensive);

        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].suggestion.as_deref(), Some("SetGloss"));
        assert_eq!(report.suggestions[0].tier, Some(Tier::Comprehensive));
    }

    #[test]
    fn test_wrapper_accessors_and_return_types() {
        let snapshot = lexicon_snapshot();
        let snippet = r#"
entry = project.LexEntry.Create("run", "stem")
sense = project.LexEntry.AddSense(entry, "to run")
project.Senses.SetGloss(sense, "run", "en")
for e in project.LexEntry.GetAll():
    e.Delete()
"#;
        let report = check(&snapshot, snippet, Tier::Comprehensive);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.statements, 5);
    }

    #[test]
    fn test_edge_access_traversal() {
        let snapshot = lexicon_snapshot();
        let snippet = "for entry in project.LexDb.Entries:\n    for sense in entry.SensesOS:\n        text = sense.Gloss";
        let report = check(&snapshot, snippet, Tier::Native);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_subscript_yields_element_type() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "entry = getEntry()\nentry.SensesOS[0].Bogus", Tier::Native);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].receiver.as_deref(), Some("Sense"));
    }

    #[test]
    fn test_unresolved_receiver_is_partial_analysis() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "thing = make_thing()\nthing.Frobnicate()", Tier::Stable);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, DiagnosticKind::PartialAnalysis);
        assert_eq!(report.warnings[0].identifier, "Frobnicate");
        assert!(report.is_valid());
    }

    #[test]
    fn test_unknown_member_without_close_match() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "entry = getEntry()\nentry.Zzzz()", Tier::Native);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].suggestion, None);
    }

    #[test]
    fn test_rebinding_replaces_type() {
        let snapshot = lexicon_snapshot();
        let report = check(
            &snapshot,
            "x = getEntry()\nx = getSense()\nx.Gloss",
            Tier::Native,
        );
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_snippet() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "", Tier::Native);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
        assert_eq!(report.statements, 0);
    }

    #[test]
    fn test_non_ascii_script_text() {
        let snapshot = lexicon_snapshot();
        let report = check(&snapshot, "gloss=\u{201c}dog\u{201d}", Tier::Native);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());

        let report = check(
            &snapshot,
            "s\u{e9}ns = getSense()\ns\u{e9}ns.Glos\u{e9}",
            Tier::Native,
        );
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].identifier, "Glos\u{e9}");
        assert_eq!(report.errors[0].receiver.as_deref(), Some("Sense"));
    }

    #[test]
    fn test_unbound_lowercase_root_is_partial_analysis() {
        let snapshot = lexicon_snapshot();
        let report = check(
            &snapshot,
            "def show(example):\n    return example.strip()",
            Tier::Native,
        );
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, DiagnosticKind::PartialAnalysis);
        assert_eq!(report.warnings[0].identifier, "strip");
        assert!(report.is_valid());
    }

    #[test]
    fn test_exact_entity_names_type_unbound_roots() {
        let snapshot = lexicon_snapshot();
        for root in ["Example", "LexExampleSentence", "ILexExampleSentence"] {
            let report = check(&snapshot, &format!("{root}.strip()"), Tier::Native);
            assert_eq!(report.errors.len(), 1, "{root}");
            assert_eq!(report.errors[0].receiver.as_deref(), Some("Example"));
        }
        let report = check(&snapshot, "lexexamplesentence.strip()", Tier::Native);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_type_tags() {
        let snapshot = lexicon_snapshot();
        let checker = Checker {
            snapshot: &snapshot,
            tier: Tier::Native,
            config: &ValidatorConfig::default(),
            vars: HashMap::new(),
            report: ValidationReport::new(Tier::Native),
        };
        let sense = snapshot.entity_idx("Sense").unwrap();
        let entry = snapshot.entity_idx("Entry").unwrap();

        assert_eq!(checker.type_of_tag("ILexSense"), Ty::Entity(sense));
        assert_eq!(checker.type_of_tag("ILexSense[]"), Ty::Collection(sense));
        assert_eq!(checker.type_of_tag("List[ILexSense]"), Ty::Collection(sense));
        assert_eq!(checker.type_of_tag("IEnumerable<ILexEntry>"), Ty::Collection(entry));
        assert_eq!(checker.type_of_tag("SIL.LCModel.ILexEntry"), Ty::Entity(entry));
        assert_eq!(checker.type_of_tag("str"), Ty::Unknown);
    }
}
