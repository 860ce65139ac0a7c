//! Per-member embedding table and its on-disk cache
//!
//! The table is reproducible from a snapshot plus an embedder. It is persisted
//! with bincode and rebuilt whenever the model, the width or the member key
//! set no longer matches.

use super::Embedder;
use crate::error::EmbeddingError;
use crate::model::Member;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Text embedded for a member: owning entity, member name, operation and
/// description.
pub fn member_text(snapshot: &Snapshot, member: &Member) -> String {
    let entity = snapshot
        .lookup(&member.entity)
        .map(|e| e.name.as_str())
        .unwrap_or(member.entity.as_str());
    format!(
        "{} {} {} {}",
        entity,
        member.name,
        member.operation.as_str(),
        member.description
    )
}

/// Member id -> embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingTable {
    model: String,
    dimension: usize,
    vectors: BTreeMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    /// Embed every member of the snapshot.
    pub fn build(snapshot: &Snapshot, embedder: &dyn Embedder) -> Result<Self, EmbeddingError> {
        let mut vectors = BTreeMap::new();
        for member in snapshot.members() {
            let vector = embedder.embed(&member_text(snapshot, member))?;
            vectors.insert(member.id.clone(), vector);
        }
        log::info!(
            "Embedded {} members with {}",
            vectors.len(),
            embedder.model_id()
        );
        Ok(Self {
            model: embedder.model_id(),
            dimension: embedder.dimension(),
            vectors,
        })
    }

    /// Read a cached table. Fails with `Stale` if it was produced by another
    /// model or for another member set.
    pub fn load(
        path: &Path,
        snapshot: &Snapshot,
        embedder: &dyn Embedder,
    ) -> Result<Self, EmbeddingError> {
        let bytes = std::fs::read(path)?;
        let table: Self = bincode::deserialize(&bytes)?;

        if table.model != embedder.model_id() {
            return Err(EmbeddingError::Stale(format!(
                "model {} != {}",
                table.model,
                embedder.model_id()
            )));
        }
        if table.dimension != embedder.dimension() {
            return Err(EmbeddingError::Stale(format!(
                "dimension {} != {}",
                table.dimension,
                embedder.dimension()
            )));
        }
        if !table.covers(snapshot) {
            return Err(EmbeddingError::Stale("member set changed".to_string()));
        }
        Ok(table)
    }

    /// Write the table with bincode, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), EmbeddingError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Use the cache at `path` if it is current, otherwise rebuild and
    /// rewrite it. A failed write is logged, not returned.
    pub fn load_or_build(
        path: &Path,
        snapshot: &Snapshot,
        embedder: &dyn Embedder,
    ) -> Result<Self, EmbeddingError> {
        match Self::load(path, snapshot, embedder) {
            Ok(table) => {
                log::debug!("Loaded embedding cache {:?}", path);
                return Ok(table);
            }
            Err(EmbeddingError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::info!("Rebuilding embedding cache {:?}: {}", path, e),
        }

        let table = Self::build(snapshot, embedder)?;
        if let Err(e) = table.save(path) {
            log::warn!("Failed to write embedding cache {:?}: {}", path, e);
        }
        Ok(table)
    }

    /// Whether the keys are exactly the snapshot's member ids
    pub fn covers(&self, snapshot: &Snapshot) -> bool {
        self.vectors.len() == snapshot.members().len()
            && snapshot
                .members()
                .iter()
                .all(|m| self.vectors.contains_key(&m.id))
    }

    pub fn get(&self, member_id: &str) -> Option<&[f32]> {
        self.vectors.get(member_id).map(Vec::as_slice)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
