//! Index model types
//!
//! Entities, members, relationship edges and cross-tier mappings as they
//! live inside a [`Snapshot`](crate::Snapshot). All of these are immutable
//! once a snapshot is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of an entity in the snapshot arena
pub type EntityIdx = usize;

/// Position of a member in the snapshot arena
pub type MemberIdx = usize;

/// Position of an edge in the snapshot arena (also its declaration order)
pub type EdgeIdx = usize;

/// Abstraction tier of the indexed API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// The native object-model API
    Native,
    /// First-generation scripting wrapper
    Stable,
    /// Second-generation, comprehensive scripting wrapper
    Comprehensive,
}

impl Tier {
    /// All tiers, in declaration order
    pub const ALL: [Tier; 3] = [Tier::Native, Tier::Stable, Tier::Comprehensive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Native => "native",
            Tier::Stable => "stable",
            Tier::Comprehensive => "comprehensive",
        }
    }

    /// Whether this tier is one of the scripting wrappers
    pub fn is_wrapper(&self) -> bool {
        !matches!(self, Tier::Native)
    }

    fn bit(self) -> u8 {
        match self {
            Tier::Native => 0b001,
            Tier::Stable => 0b010,
            Tier::Comprehensive => 0b100,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "liblcm" => Ok(Tier::Native),
            "stable" | "flexlibs" => Ok(Tier::Stable),
            "comprehensive" | "flexlibs2" => Ok(Tier::Comprehensive),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

/// Set of tiers at which a member is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierSet(u8);

impl TierSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(tier: Tier) -> Self {
        Self(tier.bit())
    }

    pub fn insert(&mut self, tier: Tier) {
        self.0 |= tier.bit();
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.0 & tier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Tiers in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(move |t| self.contains(*t))
    }

    /// Whether the set satisfies an optional tier filter
    pub fn matches(&self, filter: Option<Tier>) -> bool {
        filter.map_or(true, |t| self.contains(t))
    }
}

impl From<Vec<Tier>> for TierSet {
    fn from(tiers: Vec<Tier>) -> Self {
        let mut set = TierSet::empty();
        for tier in tiers {
            set.insert(tier);
        }
        set
    }
}

impl From<TierSet> for Vec<Tier> {
    fn from(set: TierSet) -> Self {
        set.iter().collect()
    }
}

/// Method or property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Property,
}

/// CRUD classification of a member. Declaration order is the sort order
/// used by `members_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Read,
    Update,
    Delete,
    #[default]
    Other,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Read => "read",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Other => "other",
        }
    }

    /// Infer the operation type from a member name prefix.
    pub fn infer(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| lower.starts_with(p));

        if starts(&["create", "add", "new", "insert", "append"]) {
            OperationType::Create
        } else if starts(&["delete", "remove", "clear", "erase"]) {
            OperationType::Delete
        } else if starts(&["set", "update", "modify", "replace", "merge"]) {
            OperationType::Update
        } else if starts(&["get", "find", "fetch", "list", "is", "has", "count", "iter"]) {
            OperationType::Read
        } else {
            OperationType::Other
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(OperationType::Create),
            "read" => Ok(OperationType::Read),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            "other" => Ok(OperationType::Other),
            other => Err(format!("unknown operation type '{other}'")),
        }
    }
}

/// Whether a relationship reaches a single object or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    One,
    Many,
}

/// A logical object type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Tier-specific type names (interface name, wrapper class name, ...)
    pub aliases: Vec<String>,
    /// Members in load order
    #[serde(skip)]
    pub members: Vec<MemberIdx>,
    /// Incident edges (either direction) in declaration order
    #[serde(skip)]
    pub edges: Vec<EdgeIdx>,
}

impl Entity {
    /// Whether `name` equals the id, display name or an alias
    pub fn answers_to(&self, name: &str) -> bool {
        self.id == name || self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// A method or property of an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub id: String,
    /// Owning entity id
    pub entity: String,
    pub name: String,
    pub kind: MemberKind,
    pub signature: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub tiers: TierSet,
    pub description: String,
    pub examples: Vec<String>,
    pub operation: OperationType,
}

impl Member {
    pub fn available_at(&self, tier: Tier) -> bool {
        self.tiers.contains(tier)
    }

    /// Rendered call signature, e.g. `SetGloss(sense, text, ws)`
    pub fn display_signature(&self) -> String {
        match self.kind {
            MemberKind::Property => self.name.clone(),
            MemberKind::Method => format!("{}({})", self.name, self.signature.join(", ")),
        }
    }
}

/// A directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    /// Literal access pattern usable in generated code, e.g. `entry.SensesOS`
    pub access: String,
    pub cardinality: Cardinality,
}

/// One logical capability linked across tiers. At most one member per tier;
/// a missing counterpart is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossMapping {
    pub id: String,
    pub capability: String,
    pub native: Option<String>,
    pub stable: Option<String>,
    pub comprehensive: Option<String>,
}

impl CrossMapping {
    /// Member id mapped at `tier`, if any
    pub fn member_at(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Native => self.native.as_deref(),
            Tier::Stable => self.stable.as_deref(),
            Tier::Comprehensive => self.comprehensive.as_deref(),
        }
    }

    /// All (tier, member id) slots that are filled
    pub fn slots(&self) -> impl Iterator<Item = (Tier, &str)> + '_ {
        Tier::ALL
            .into_iter()
            .filter_map(move |t| self.member_at(t).map(|m| (t, m)))
    }
}
