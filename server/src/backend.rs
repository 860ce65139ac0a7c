//! Shared server state: the snapshot store plus everything the tool handlers
//! need alongside it.

use crate::cache::QueryCache;
use crate::error::{ServerError, ServerResult};
use flexdex_core::{
    CachedEmbedder, Embedder, EmbeddingTable, EngineConfig, LoadResult, RefreshOutcome,
    SearchOptions, Snapshot, SnapshotStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Embedding cache location, relative to the index directory. Hidden, so the
/// loader and the watcher both skip it.
pub const EMBEDDING_CACHE: &str = ".cache/embeddings.bin";

/// Backend behind the MCP tools and the CLI subcommands.
pub struct FlexdexBackend {
    pub store: Arc<SnapshotStore>,
    pub config: EngineConfig,
    pub cache: QueryCache,
    embedder: Option<Arc<CachedEmbedder>>,
    index_dir: Option<PathBuf>,
}

impl FlexdexBackend {
    pub fn new(store: Arc<SnapshotStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            cache: QueryCache::default(),
            embedder: None,
            index_dir: None,
        }
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = Some(dir.into());
        self
    }

    /// Enable the semantic search stage.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(Arc::new(CachedEmbedder::new(embedder)));
        self
    }

    pub fn index_dir(&self) -> Option<&Path> {
        self.index_dir.as_deref()
    }

    pub fn embedder(&self) -> Option<Arc<CachedEmbedder>> {
        self.embedder.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    pub fn search_options(&self) -> SearchOptions<'_> {
        SearchOptions {
            weights: &self.config.search,
            embedder: self.embedder.as_deref().map(|e| e as &dyn Embedder),
        }
    }

    /// Rebuild the snapshot from the index directory and publish it.
    /// Blocking; the server calls it from `spawn_blocking`.
    pub fn reload(&self) -> ServerResult<RefreshOutcome> {
        let dir = self.index_dir.as_deref().ok_or(ServerError::NoIndexDir)?;
        reload_store(&self.store, dir, self.embedder.as_deref())
    }
}

/// Load `dir` and attach embeddings when an embedder is configured.
///
/// Embedding trouble never fails the load: the snapshot is published without
/// a table and search stays lexical.
pub fn build_snapshot(dir: &Path, embedder: Option<&CachedEmbedder>) -> LoadResult<Snapshot> {
    let snapshot = Snapshot::load_dir(dir)?;
    let Some(embedder) = embedder else {
        return Ok(snapshot);
    };

    match EmbeddingTable::load_or_build(&dir.join(EMBEDDING_CACHE), &snapshot, embedder) {
        Ok(table) => Ok(snapshot.with_embeddings(table)),
        Err(e) => {
            tracing::warn!("Semantic stage disabled for this snapshot: {}", e);
            Ok(snapshot)
        }
    }
}

/// Refresh `store` from `dir`, logging the outcome.
pub fn reload_store(
    store: &SnapshotStore,
    dir: &Path,
    embedder: Option<&CachedEmbedder>,
) -> ServerResult<RefreshOutcome> {
    let outcome = store.refresh(|| build_snapshot(dir, embedder))?;
    match &outcome {
        RefreshOutcome::Published { generation } => {
            let snapshot = store.current();
            let report = snapshot.report();
            tracing::info!(
                "Index generation {}: {} entities, {} members, {} relationships, {} rejected records",
                generation,
                report.entities,
                report.members,
                report.relationships,
                report.rejected.len()
            );
            for rejected in &report.rejected {
                tracing::warn!("Rejected record in {}: {}", rejected.origin, rejected.reason);
            }
        }
        RefreshOutcome::Superseded { ticket, current } => {
            tracing::debug!(
                "Refresh #{} superseded by generation {}",
                ticket,
                current
            );
        }
    }
    Ok(outcome)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::fs;

    /// Writes a small three-tier index to a temp dir.
    pub fn write_index(dir: &Path) {
        let native = serde_json::json!({
            "tier": "native", "category": "lexicon",
            "entities": [
                {"id": "Entry", "name": "LexEntry", "aliases": ["ILexEntry"], "description": "A dictionary entry"},
                {"id": "Sense", "name": "LexSense", "aliases": ["ILexSense"], "description": "One meaning of an entry"},
                {"id": "Example", "name": "LexExampleSentence", "aliases": ["ILexExampleSentence"]},
                {"id": "Book", "name": "ScrBook", "category": "scripture"}
            ],
            "members": [
                {"id": "Entry.SensesOS", "entity": "Entry", "name": "SensesOS", "kind": "property",
                 "return_type": "ILexSense[]", "description": "Senses owned by the entry"},
                {"id": "Sense.Gloss", "entity": "Sense", "name": "Gloss", "kind": "property",
                 "description": "Short gloss of the sense", "examples": ["sense.Gloss.AnalysisDefaultWritingSystem"]},
                {"id": "Sense.ExamplesOS", "entity": "Sense", "name": "ExamplesOS", "kind": "property",
                 "return_type": "ILexExampleSentence[]"},
                {"id": "Book.Title", "entity": "Book", "name": "Title", "kind": "property"}
            ],
            "relationships": [
                {"from": "Entry", "to": "Sense", "label": "senses", "access": "entry.SensesOS", "cardinality": "many"},
                {"from": "Sense", "to": "Example", "label": "examples", "access": "sense.ExamplesOS", "cardinality": "many"}
            ]
        });
        let comprehensive = serde_json::json!({
            "tier": "comprehensive", "category": "lexicon",
            "members": [
                {"id": "Sense.SetGloss", "entity": "Sense", "name": "SetGloss", "kind": "method",
                 "signature": ["sense", "text", "ws"], "description": "Set the gloss of a sense",
                 "examples": ["project.LexiconSense.SetGloss(sense, 'dog', 'en')"]},
                {"id": "Entry.GetAll", "entity": "Entry", "name": "GetAll", "kind": "method",
                 "return_type": "ILexEntry[]", "description": "All lexical entries",
                 "examples": ["for entry in project.LexiconAllEntries():"]},
                {"id": "Book.FindByTitle", "entity": "Book", "name": "FindByTitle", "kind": "method",
                 "signature": ["title"], "description": "Look up a book by its title",
                 "examples": ["book = project.Scripture.FindByTitle('Mark')"]}
            ],
            "mappings": [
                {"id": "sense-gloss", "native": "Sense.Gloss", "comprehensive": "Sense.SetGloss"}
            ]
        });
        fs::create_dir_all(dir.join("native")).unwrap();
        fs::create_dir_all(dir.join("comprehensive")).unwrap();
        fs::write(dir.join("native/lexicon.json"), native.to_string()).unwrap();
        fs::write(
            dir.join("comprehensive/lexicon.json"),
            comprehensive.to_string(),
        )
        .unwrap();
    }

    pub fn loaded_backend(dir: &Path) -> FlexdexBackend {
        write_index(dir);
        let backend = FlexdexBackend::new(Arc::new(SnapshotStore::empty()), EngineConfig::default())
            .with_index_dir(dir);
        backend.reload().unwrap();
        backend
    }
}
