//! Query embedding cache
//!
//! Wraps any [`Embedder`] with a DashMap cache so repeated queries are
//! embedded once.

use super::Embedder;
use crate::error::EmbeddingError;
use dashmap::DashMap;
use std::sync::Arc;

/// Embedder with a concurrent per-text cache
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: DashMap<String, Vec<f32>>,
    capacity: usize,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(inner, 4096)
    }

    /// Cache at most `capacity` texts; the cache is cleared when full.
    pub fn with_capacity(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        log::info!(
            "Embedder ready ({}, {}d)",
            inner.model_id(),
            inner.dimension()
        );
        Self {
            inner,
            cache: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Batch embed with caching
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Embedder for CachedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached.clone());
        }

        let embedding = self.inner.embed(text)?;
        if self.cache.len() >= self.capacity {
            log::debug!("Embedding cache full ({} entries), clearing", self.cache.len());
            self.cache.clear();
        }
        self.cache.insert(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_id(&self) -> String {
        self.inner.model_id()
    }
}
