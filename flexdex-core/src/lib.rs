//! Flexdex API Surface Index
//!
//! In-memory index of a three-tier API surface (a native object model and two
//! generations of a scripting wrapper over it) plus the query engine built on
//! top of it.
//!
//! ## Features
//!
//! - **Immutable snapshots** - Built once from JSON records, swapped atomically on refresh
//! - **Capability search** - Weighted lexical + synonym scoring with optional semantic re-ranking
//! - **Navigation paths** - Shortest, deterministic routes through the relationship graph
//! - **Script validation** - Static member and tier checks with "did you mean" suggestions
//!
//! ## Example
//!
//! ```ignore
//! use flexdex_core::{find_path, validate, EngineConfig, SnapshotStore, Tier};
//!
//! let store = SnapshotStore::empty();
//! store.refresh_from_dir(&index_dir)?;
//! let snapshot = store.current();
//!
//! let path = find_path(&snapshot, "Entry", "Example")?;
//! let report = validate(&snapshot, "x = getEntry(); x.SetGloss(s, 'a', 'en')",
//!     Tier::Comprehensive, &EngineConfig::default().validator);
//! ```

pub mod categorize;
pub mod config;
pub mod embedding;
pub mod error;
pub mod model;
pub mod path;
pub mod records;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod synonyms;
pub mod text;
pub mod validator;

#[cfg(test)]
mod fixtures;

// Re-exports for convenience
pub use config::{EngineConfig, SearchWeights, ValidatorConfig};
pub use embedding::{CachedEmbedder, Embedder, EmbeddingTable, HashingEmbedder};
pub use error::{EmbeddingError, LoadError, LoadResult, QueryError, QueryResult};
pub use model::{
    Cardinality, CrossMapping, Entity, Member, MemberKind, OperationType, RelationshipEdge, Tier,
    TierSet,
};
pub use path::{find_path, render_snippet, NavigationPath, PathStep};
pub use records::RecordBatch;
pub use search::{search, HitKind, MatchReason, SearchHit, SearchOptions};
pub use snapshot::{CategorySummary, ExampleOperation, ExampleQuery, LoadReport, Snapshot};
pub use store::{RefreshOutcome, RefreshTicket, SnapshotStore};
pub use synonyms::SynonymTable;
pub use validator::{validate, Diagnostic, DiagnosticKind, Suggestion, ValidationReport};
