//! Immutable index snapshot
//!
//! A [`Snapshot`] is built once from a [`RecordBatch`] and never mutated
//! afterwards. Entities, members and edges live in flat arenas addressed by
//! index; the relationship graph is an adjacency list over entity indices, so
//! a whole snapshot can be rebuilt and swapped without touching the old one.

use crate::categorize::{infer_category, strip_interface_prefix};
use crate::embedding::EmbeddingTable;
use crate::error::{LoadError, LoadResult, QueryError, QueryResult};
use crate::model::{
    CrossMapping, EdgeIdx, Entity, EntityIdx, Member, MemberIdx, OperationType,
    RelationshipEdge, Tier, TierSet,
};
use crate::records::{RecordBatch, RejectedRecord};
use crate::synonyms::SynonymTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

/// Summary of what a load ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub documents: usize,
    pub entities: usize,
    pub members: usize,
    pub relationships: usize,
    pub mappings: usize,
    pub rejected: Vec<RejectedRecord>,
}

/// Per-category counts for `list_categories`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub entities: usize,
    pub members_by_tier: BTreeMap<Tier, usize>,
}

/// Operation filter for [`Snapshot::find_examples`]: a declared operation
/// type, or one of two name-pattern groups that cut across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleOperation {
    Is(OperationType),
    /// `GetAll`, `List*`, `Iterate*` and owning collections (`*OS`, `*OC`)
    Iterate,
    /// `Find*`, `Search*`, `Query*`
    Search,
}

impl ExampleOperation {
    pub fn matches(&self, member: &Member) -> bool {
        let lower = member.name.to_lowercase();
        let contains = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        match self {
            ExampleOperation::Is(op) => member.operation == *op,
            ExampleOperation::Iterate => {
                contains(&["getall", "list", "iterate", "enumerate"])
                    || member.name.ends_with("OS")
                    || member.name.ends_with("OC")
            }
            ExampleOperation::Search => contains(&["find", "search", "query"]),
        }
    }
}

impl From<OperationType> for ExampleOperation {
    fn from(op: OperationType) -> Self {
        ExampleOperation::Is(op)
    }
}

impl FromStr for ExampleOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iterate" => Ok(ExampleOperation::Iterate),
            "search" => Ok(ExampleOperation::Search),
            other => other.parse::<OperationType>().map(ExampleOperation::Is),
        }
    }
}

/// Filters for [`Snapshot::find_examples`]. Fragments match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ExampleQuery {
    pub method: Option<String>,
    pub operation: Option<ExampleOperation>,
    pub object: Option<String>,
    pub tier: Option<Tier>,
    pub limit: usize,
}

/// An immutable, fully validated view of the indexed API surface.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    entities: Vec<Entity>,
    entity_index: HashMap<String, EntityIdx>,
    members: Vec<Member>,
    member_index: HashMap<String, MemberIdx>,
    member_owner: Vec<EntityIdx>,
    edges: Vec<RelationshipEdge>,
    edge_endpoints: Vec<(EntityIdx, EntityIdx)>,
    /// entity -> (edge, neighbor), edges in declaration order, both directions
    adjacency: Vec<Vec<(EdgeIdx, EntityIdx)>>,
    mappings: Vec<CrossMapping>,
    synonyms: SynonymTable,
    embeddings: Option<EmbeddingTable>,
    report: LoadReport,
}

impl Snapshot {
    /// A snapshot with no entities, served before the first successful load.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            built_at: Utc::now(),
            entities: Vec::new(),
            entity_index: HashMap::new(),
            members: Vec::new(),
            member_index: HashMap::new(),
            member_owner: Vec::new(),
            edges: Vec::new(),
            edge_endpoints: Vec::new(),
            adjacency: Vec::new(),
            mappings: Vec::new(),
            synonyms: SynonymTable::builtin(),
            embeddings: None,
            report: LoadReport::default(),
        }
    }

    /// Read and load every document under `dir`.
    pub fn load_dir(dir: &Path) -> LoadResult<Self> {
        let batch = RecordBatch::from_dir(dir)?;
        Self::load(&batch)
    }

    /// Build a snapshot, validating referential integrity.
    ///
    /// Any dangling reference or duplicate identifier fails the whole load.
    pub fn load(batch: &RecordBatch) -> LoadResult<Self> {
        let mut rejected = batch.rejected.clone();

        // Entities
        let mut entities = Vec::with_capacity(batch.entities.len());
        let mut entity_index = HashMap::with_capacity(batch.entities.len());
        for sourced in &batch.entities {
            let record = &sourced.record;
            if entity_index.contains_key(&record.id) {
                return Err(LoadError::DuplicateId {
                    kind: "entity",
                    id: record.id.clone(),
                });
            }
            let category = record
                .category
                .clone()
                .or_else(|| sourced.category.clone())
                .or_else(|| {
                    infer_category(&record.name)
                        .or_else(|| infer_category(&record.id))
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "general".to_string());

            entity_index.insert(record.id.clone(), entities.len());
            entities.push(Entity {
                id: record.id.clone(),
                name: record.name.clone(),
                category,
                description: record.description.clone(),
                aliases: record.aliases.clone(),
                members: Vec::new(),
                edges: Vec::new(),
            });
        }

        // Tier slots claimed by mappings count as availability
        let mut mapped_tiers: HashMap<&str, TierSet> = HashMap::new();
        for sourced in &batch.mappings {
            for (tier, member_id) in mapping_slots(&sourced.record) {
                mapped_tiers.entry(member_id).or_default().insert(tier);
            }
        }

        // Members
        let mut members = Vec::with_capacity(batch.members.len());
        let mut member_index = HashMap::with_capacity(batch.members.len());
        let mut member_owner = Vec::with_capacity(batch.members.len());
        for sourced in &batch.members {
            let record = &sourced.record;
            if member_index.contains_key(&record.id) {
                return Err(LoadError::DuplicateId {
                    kind: "member",
                    id: record.id.clone(),
                });
            }
            let owner = *entity_index
                .get(&record.entity)
                .ok_or_else(|| LoadError::dangling(&sourced.origin, "entity", &record.entity))?;

            let mut tiers = match &record.tiers {
                Some(explicit) => TierSet::from(explicit.clone()),
                None => sourced.tier.map(TierSet::single).unwrap_or_default(),
            };
            if let Some(mapped) = mapped_tiers.get(record.id.as_str()) {
                for tier in mapped.iter() {
                    tiers.insert(tier);
                }
            }
            if tiers.is_empty() {
                log::warn!("Rejected member {}: no tier availability", record.id);
                rejected.push(RejectedRecord {
                    origin: sourced.origin.clone(),
                    reason: format!("member '{}' is not available at any tier", record.id),
                });
                continue;
            }

            let idx = members.len();
            member_index.insert(record.id.clone(), idx);
            member_owner.push(owner);
            entities[owner].members.push(idx);
            members.push(Member {
                id: record.id.clone(),
                entity: record.entity.clone(),
                name: record.name.clone(),
                kind: record.kind,
                signature: record.signature.clone(),
                return_type: record.return_type.clone(),
                tiers,
                description: record.description.clone(),
                examples: record.examples.clone(),
                operation: record
                    .operation
                    .unwrap_or_else(|| OperationType::infer(&record.name)),
            });
        }

        // Cross mappings
        let mut mappings = Vec::with_capacity(batch.mappings.len());
        let mut mapping_ids = HashSet::new();
        for sourced in &batch.mappings {
            let record = &sourced.record;
            if !mapping_ids.insert(record.id.as_str()) {
                return Err(LoadError::DuplicateId {
                    kind: "mapping",
                    id: record.id.clone(),
                });
            }
            let mut seen = HashSet::new();
            for (_, member_id) in mapping_slots(record) {
                if !member_index.contains_key(member_id) {
                    return Err(LoadError::dangling(&sourced.origin, "member", member_id));
                }
                if !seen.insert(member_id) {
                    return Err(LoadError::InconsistentMapping {
                        mapping: record.id.clone(),
                        message: format!("member '{member_id}' occupies more than one tier slot"),
                    });
                }
            }
            mappings.push(CrossMapping {
                id: record.id.clone(),
                capability: record.capability.clone(),
                native: record.native.clone(),
                stable: record.stable.clone(),
                comprehensive: record.comprehensive.clone(),
            });
        }

        // Relationship graph
        let mut edges = Vec::with_capacity(batch.relationships.len());
        let mut edge_endpoints = Vec::with_capacity(batch.relationships.len());
        let mut adjacency: Vec<Vec<(EdgeIdx, EntityIdx)>> = vec![Vec::new(); entities.len()];
        for sourced in &batch.relationships {
            let record = &sourced.record;
            let from = *entity_index
                .get(&record.from)
                .ok_or_else(|| LoadError::dangling(&sourced.origin, "entity", &record.from))?;
            let to = *entity_index
                .get(&record.to)
                .ok_or_else(|| LoadError::dangling(&sourced.origin, "entity", &record.to))?;

            let idx = edges.len();
            adjacency[from].push((idx, to));
            entities[from].edges.push(idx);
            if from != to {
                adjacency[to].push((idx, from));
                entities[to].edges.push(idx);
            }
            edge_endpoints.push((from, to));
            edges.push(RelationshipEdge {
                from: record.from.clone(),
                to: record.to.clone(),
                label: record.label.clone(),
                access: record.access.clone(),
                cardinality: record.cardinality,
            });
        }

        let mut synonyms = SynonymTable::builtin();
        for sourced in &batch.synonyms {
            synonyms.insert(
                &sourced.record.term,
                sourced.record.synonyms.iter().map(String::as_str),
            );
        }

        let report = LoadReport {
            documents: batch.documents,
            entities: entities.len(),
            members: members.len(),
            relationships: edges.len(),
            mappings: mappings.len(),
            rejected,
        };

        log::info!(
            "Built snapshot: {} entities, {} members, {} edges, {} mappings ({} rejected records)",
            report.entities,
            report.members,
            report.relationships,
            report.mappings,
            report.rejected.len()
        );

        Ok(Self {
            generation: 0,
            built_at: Utc::now(),
            entities,
            entity_index,
            members,
            member_index,
            member_owner,
            edges,
            edge_endpoints,
            adjacency,
            mappings,
            synonyms,
            embeddings: None,
            report,
        })
    }

    /// Stamp the snapshot with the refresh generation that built it.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Attach precomputed member embeddings for the semantic search stage.
    ///
    /// Only valid before the snapshot is shared; a table whose keys do not
    /// match this snapshot is dropped.
    pub fn with_embeddings(mut self, table: EmbeddingTable) -> Self {
        if table.covers(&self) {
            self.embeddings = Some(table);
        } else {
            log::warn!("Embedding table does not match snapshot members, semantic stage disabled");
        }
        self
    }

    // ==========================================
    // Lookup
    // ==========================================

    /// Entity by stable identifier.
    pub fn lookup(&self, entity_id: &str) -> QueryResult<&Entity> {
        self.entity_index
            .get(entity_id)
            .map(|&idx| &self.entities[idx])
            .ok_or_else(|| QueryError::not_found(entity_id))
    }

    /// Entity by loose name: id, alias, case-insensitive match, then with an
    /// interface `I` prefix or `Operations` suffix removed.
    pub fn resolve(&self, name: &str) -> QueryResult<&Entity> {
        self.resolve_idx(name)
            .map(|idx| &self.entities[idx])
            .ok_or_else(|| QueryError::not_found(name))
    }

    pub(crate) fn resolve_idx(&self, name: &str) -> Option<EntityIdx> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some(&idx) = self.entity_index.get(name) {
            return Some(idx);
        }
        if let Some(idx) = self.entities.iter().position(|e| e.answers_to(name)) {
            return Some(idx);
        }
        let lower = name.to_lowercase();
        if let Some(idx) = self.entities.iter().position(|e| {
            e.id.to_lowercase() == lower
                || e.name.to_lowercase() == lower
                || e.aliases.iter().any(|a| a.to_lowercase() == lower)
        }) {
            return Some(idx);
        }

        let stripped = strip_operations_suffix(strip_interface_prefix(name));
        if stripped != name && !stripped.is_empty() {
            return self.resolve_idx(stripped);
        }
        None
    }

    /// Entity by exact id, name or alias. An interface `I` prefix is
    /// tolerated; case is not.
    pub(crate) fn named_idx(&self, name: &str) -> Option<EntityIdx> {
        if let Some(&idx) = self.entity_index.get(name) {
            return Some(idx);
        }
        if let Some(idx) = self.entities.iter().position(|e| e.answers_to(name)) {
            return Some(idx);
        }
        let stripped = strip_interface_prefix(name);
        if stripped != name && !stripped.is_empty() {
            return self.named_idx(stripped);
        }
        None
    }

    /// Members of an entity available at `tier` (all tiers when `None`),
    /// ordered by (operation type, name, id).
    pub fn members_of(&self, entity_id: &str, tier: Option<Tier>) -> QueryResult<Vec<&Member>> {
        let entity = self.lookup(entity_id)?;
        let mut members: Vec<&Member> = entity
            .members
            .iter()
            .map(|&idx| &self.members[idx])
            .filter(|m| m.tiers.matches(tier))
            .collect();
        members.sort_by(|a, b| {
            a.operation
                .cmp(&b.operation)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(members)
    }

    /// Member by stable identifier.
    pub fn member(&self, member_id: &str) -> QueryResult<&Member> {
        self.member_index
            .get(member_id)
            .map(|&idx| &self.members[idx])
            .ok_or_else(|| QueryError::not_found(member_id))
    }

    /// Cross mappings with at least one slot on a member of this entity.
    pub fn capabilities_of(&self, entity_id: &str) -> QueryResult<Vec<&CrossMapping>> {
        let entity_idx = *self
            .entity_index
            .get(entity_id)
            .ok_or_else(|| QueryError::not_found(entity_id))?;

        Ok(self
            .mappings
            .iter()
            .filter(|m| {
                m.slots().any(|(_, member_id)| {
                    self.member_index
                        .get(member_id)
                        .map_or(false, |&idx| self.member_owner[idx] == entity_idx)
                })
            })
            .collect())
    }

    /// Entities whose id, name or alias contains `fragment` (case-insensitive),
    /// in load order.
    pub fn find_entities(&self, fragment: &str) -> Vec<&Entity> {
        let needle = fragment.to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entities
            .iter()
            .filter(|e| {
                e.id.to_lowercase().contains(&needle)
                    || e.name.to_lowercase().contains(&needle)
                    || e.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Category summaries sorted by category name.
    pub fn categories(&self) -> Vec<CategorySummary> {
        let mut summaries: BTreeMap<&str, CategorySummary> = BTreeMap::new();
        for entity in &self.entities {
            let summary = summaries
                .entry(entity.category.as_str())
                .or_insert_with(|| CategorySummary {
                    name: entity.category.clone(),
                    entities: 0,
                    members_by_tier: Tier::ALL.iter().map(|t| (*t, 0)).collect(),
                });
            summary.entities += 1;
            for &idx in &entity.members {
                for tier in self.members[idx].tiers.iter() {
                    *summary.members_by_tier.entry(tier).or_insert(0) += 1;
                }
            }
        }
        summaries.into_values().collect()
    }

    /// Entities in a category (case-insensitive), in load order.
    pub fn entities_in_category(&self, category: &str) -> Vec<&Entity> {
        let category = category.to_lowercase();
        self.entities
            .iter()
            .filter(|e| e.category.to_lowercase() == category)
            .collect()
    }

    /// Members that carry examples, filtered, in load order.
    pub fn find_examples(&self, query: &ExampleQuery) -> Vec<&Member> {
        let method = query.method.as_ref().map(|m| m.to_lowercase());
        let object = query.object.as_ref().map(|o| o.to_lowercase());

        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.examples.is_empty())
            .filter(|(_, m)| m.tiers.matches(query.tier))
            .filter(|(_, m)| query.operation.map_or(true, |op| op.matches(m)))
            .filter(|(_, m)| {
                method
                    .as_ref()
                    .map_or(true, |needle| m.name.to_lowercase().contains(needle))
            })
            .filter(|(idx, _)| {
                object.as_ref().map_or(true, |needle| {
                    let owner = &self.entities[self.member_owner[*idx]];
                    owner.id.to_lowercase().contains(needle)
                        || owner.name.to_lowercase().contains(needle)
                        || owner.aliases.iter().any(|a| a.to_lowercase().contains(needle))
                })
            })
            .map(|(_, m)| m)
            .take(query.limit)
            .collect()
    }

    // ==========================================
    // Arena access
    // ==========================================

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn edges(&self) -> &[RelationshipEdge] {
        &self.edges
    }

    pub fn mappings(&self) -> &[CrossMapping] {
        &self.mappings
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn embeddings(&self) -> Option<&EmbeddingTable> {
        self.embeddings.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn entity_idx(&self, entity_id: &str) -> Option<EntityIdx> {
        self.entity_index.get(entity_id).copied()
    }

    pub(crate) fn entity_at(&self, idx: EntityIdx) -> &Entity {
        &self.entities[idx]
    }

    pub(crate) fn member_at(&self, idx: MemberIdx) -> &Member {
        &self.members[idx]
    }

    pub(crate) fn edge_at(&self, idx: EdgeIdx) -> &RelationshipEdge {
        &self.edges[idx]
    }

    pub(crate) fn edge_endpoints(&self, idx: EdgeIdx) -> (EntityIdx, EntityIdx) {
        self.edge_endpoints[idx]
    }

    pub(crate) fn neighbors(&self, idx: EntityIdx) -> &[(EdgeIdx, EntityIdx)] {
        &self.adjacency[idx]
    }

    pub(crate) fn owner_of(&self, member: MemberIdx) -> EntityIdx {
        self.member_owner[member]
    }
}

/// `LexEntryOperations` -> `LexEntry`, case-insensitively.
fn strip_operations_suffix(name: &str) -> &str {
    const SUFFIX: &str = "operations";
    let cut = name.len().saturating_sub(SUFFIX.len());
    if name.len() > SUFFIX.len()
        && name.is_char_boundary(cut)
        && name[cut..].eq_ignore_ascii_case(SUFFIX)
    {
        &name[..cut]
    } else {
        name
    }
}

fn mapping_slots(record: &crate::records::MappingRecord) -> impl Iterator<Item = (Tier, &str)> {
    [
        (Tier::Native, record.native.as_deref()),
        (Tier::Stable, record.stable.as_deref()),
        (Tier::Comprehensive, record.comprehensive.as_deref()),
    ]
    .into_iter()
    .filter_map(|(tier, id)| id.map(|id| (tier, id)))
}
