//! Capability search
//!
//! Ranks members and entities against a free-text query. Lexical scoring
//! weighs term overlap per field (name > category > operation > description),
//! adds a fixed bonus for an exact name match and a reduced bonus for synonym
//! matches. An optional semantic stage re-ranks lexically matching candidates
//! by cosine similarity against precomputed member embeddings.

use crate::config::SearchWeights;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{QueryError, QueryResult};
use crate::model::{Entity, Member, OperationType, Tier, TierSet};
use crate::snapshot::Snapshot;
use crate::text::{query_terms, tokenize};
use serde::Serialize;
use std::collections::HashSet;

/// Search options beyond the query itself
#[derive(Clone, Copy)]
pub struct SearchOptions<'a> {
    pub weights: &'a SearchWeights,
    /// Enables the semantic stage when the snapshot carries embeddings
    pub embedder: Option<&'a dyn Embedder>,
}

impl<'a> SearchOptions<'a> {
    pub fn lexical(weights: &'a SearchWeights) -> Self {
        Self {
            weights,
            embedder: None,
        }
    }
}

/// What a hit refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Member,
    Entity,
}

/// Why a candidate matched
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchReason {
    ExactName,
    TextMatch { score: f32 },
    SynonymMatch { score: f32 },
    SemanticSimilarity { score: f32 },
}

/// Ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub kind: HitKind,
    pub id: String,
    pub name: String,
    /// Owning entity id (the entity itself for entity hits)
    pub entity: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    pub description: String,
    pub tiers: TierSet,
    pub score: f32,
    pub match_reasons: Vec<MatchReason>,
}

/// Searchable fields of one candidate
struct Fields {
    names: HashSet<String>,
    whole_names: Vec<String>,
    category: HashSet<String>,
    operation: Option<OperationType>,
    description: HashSet<String>,
}

impl Fields {
    fn of_member(member: &Member, owner: &Entity) -> Self {
        Self {
            names: tokenize(&member.name).into_iter().collect(),
            whole_names: vec![member.name.to_lowercase()],
            category: tokenize(&owner.category).into_iter().collect(),
            operation: Some(member.operation),
            description: tokenize(&format!("{} {}", member.description, owner.name))
                .into_iter()
                .collect(),
        }
    }

    fn of_entity(entity: &Entity) -> Self {
        let mut names: HashSet<String> = tokenize(&entity.name).into_iter().collect();
        names.extend(tokenize(&entity.id));
        let mut whole_names = vec![entity.name.to_lowercase(), entity.id.to_lowercase()];
        for alias in &entity.aliases {
            names.extend(tokenize(alias));
            whole_names.push(alias.to_lowercase());
        }
        Self {
            names,
            whole_names,
            category: tokenize(&entity.category).into_iter().collect(),
            operation: None,
            description: tokenize(&entity.description).into_iter().collect(),
        }
    }

    /// Weighted overlap of `terms` with the fields
    fn overlap(&self, terms: &[String], weights: &SearchWeights) -> f32 {
        let mut score = 0.0;
        for term in terms {
            if self.names.iter().any(|t| same_term(term, t))
                || self.whole_names.iter().any(|n| n == term)
            {
                score += weights.name;
            }
            if self.category.iter().any(|t| same_term(term, t)) {
                score += weights.category;
            }
            if self.operation.map_or(false, |op| op.as_str() == term) {
                score += weights.operation;
            }
            if self.description.iter().any(|t| same_term(term, t)) {
                score += weights.description;
            }
        }
        score
    }
}

/// Token equality, tolerating a plural `s`
fn same_term(a: &str, b: &str) -> bool {
    fn singular(t: &str) -> &str {
        if t.len() > 3 {
            t.strip_suffix('s').unwrap_or(t)
        } else {
            t
        }
    }
    a == b || singular(a) == singular(b)
}

struct Candidate {
    hit: SearchHit,
    lexical: f32,
    /// Member ids whose embeddings represent this candidate
    embedded_as: Vec<String>,
}

/// Rank members and entities against `query`.
///
/// An empty query or one that matches nothing yields an empty result;
/// `max_results == 0` is an invalid argument.
pub fn search(
    snapshot: &Snapshot,
    query: &str,
    max_results: usize,
    tier: Option<Tier>,
    options: SearchOptions<'_>,
) -> QueryResult<Vec<SearchHit>> {
    if max_results == 0 {
        return Err(QueryError::invalid_argument("max_results must be positive"));
    }

    let terms = query_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }
    let (literal, synonyms) = snapshot.synonyms().expand(&terms);
    let whole_query = query.trim().to_lowercase();
    let weights = options.weights;

    let mut candidates = Vec::new();

    for member in snapshot.members() {
        if !member.tiers.matches(tier) {
            continue;
        }
        let Ok(owner) = snapshot.lookup(&member.entity) else {
            continue;
        };
        let fields = Fields::of_member(member, owner);
        if let Some((lexical, reasons)) = lexical_score(&fields, &whole_query, &literal, &synonyms, weights) {
            candidates.push(Candidate {
                hit: SearchHit {
                    kind: HitKind::Member,
                    id: member.id.clone(),
                    name: member.name.clone(),
                    entity: member.entity.clone(),
                    category: owner.category.clone(),
                    signature: Some(member.display_signature()),
                    description: member.description.clone(),
                    tiers: member.tiers,
                    score: lexical,
                    match_reasons: reasons,
                },
                lexical,
                embedded_as: vec![member.id.clone()],
            });
        }
    }

    for entity in snapshot.entities() {
        let mut tiers = TierSet::empty();
        let mut embedded_as = Vec::new();
        for member in snapshot.members_of(&entity.id, tier)? {
            for t in member.tiers.iter() {
                tiers.insert(t);
            }
            embedded_as.push(member.id.clone());
        }
        if tier.is_some() && embedded_as.is_empty() {
            continue;
        }

        let fields = Fields::of_entity(entity);
        if let Some((lexical, reasons)) = lexical_score(&fields, &whole_query, &literal, &synonyms, weights) {
            candidates.push(Candidate {
                hit: SearchHit {
                    kind: HitKind::Entity,
                    id: entity.id.clone(),
                    name: entity.name.clone(),
                    entity: entity.id.clone(),
                    category: entity.category.clone(),
                    signature: None,
                    description: entity.description.clone(),
                    tiers,
                    score: lexical,
                    match_reasons: reasons,
                },
                lexical,
                embedded_as,
            });
        }
    }

    if let Some(embedder) = options.embedder {
        apply_semantic_stage(snapshot, query, embedder, weights, &mut candidates);
    }

    let mut hits: Vec<SearchHit> = candidates.into_iter().map(|c| c.hit).collect();
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(max_results);

    log::debug!("search {:?}: {} hits", query, hits.len());
    Ok(hits)
}

fn lexical_score(
    fields: &Fields,
    whole_query: &str,
    literal: &[String],
    synonyms: &[String],
    weights: &SearchWeights,
) -> Option<(f32, Vec<MatchReason>)> {
    let mut reasons = Vec::new();
    let mut score = 0.0;

    if fields.whole_names.iter().any(|n| n == whole_query) {
        score += weights.exact_name;
        reasons.push(MatchReason::ExactName);
    }

    let text = fields.overlap(literal, weights);
    if text > 0.0 {
        score += text;
        reasons.push(MatchReason::TextMatch { score: text });
    }

    let synonym = fields.overlap(synonyms, weights) * weights.synonym_factor;
    if synonym > 0.0 {
        score += synonym;
        reasons.push(MatchReason::SynonymMatch { score: synonym });
    }

    (score > 0.0).then_some((score, reasons))
}

/// Re-rank lexical candidates by similarity. Leaves scores untouched when the
/// snapshot has no embeddings or the query cannot be embedded.
fn apply_semantic_stage(
    snapshot: &Snapshot,
    query: &str,
    embedder: &dyn Embedder,
    weights: &SearchWeights,
    candidates: &mut [Candidate],
) {
    let Some(table) = snapshot.embeddings() else {
        return;
    };
    if table.dimension() != embedder.dimension() {
        log::warn!(
            "Embedding width mismatch ({} vs {}), lexical ranking only",
            table.dimension(),
            embedder.dimension()
        );
        return;
    }
    let query_vector = match embedder.embed(query) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("Semantic stage skipped: {}", e);
            return;
        }
    };

    let max_lexical = candidates
        .iter()
        .map(|c| c.lexical)
        .fold(0.0_f32, f32::max);
    if max_lexical <= 0.0 {
        return;
    }

    for candidate in candidates.iter_mut() {
        let similarity = candidate
            .embedded_as
            .iter()
            .filter_map(|id| table.get(id))
            .map(|v| cosine_similarity(&query_vector, v))
            .fold(0.0_f32, f32::max);

        candidate.hit.score = weights.lexical_weight * (candidate.lexical / max_lexical)
            + weights.semantic_weight * similarity;
        if similarity > 0.0 {
            candidate
                .hit
                .match_reasons
                .push(MatchReason::SemanticSimilarity { score: similarity });
        }
    }
}
