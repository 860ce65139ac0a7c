//! Embedding layer for the semantic search stage
//!
//! An [`Embedder`] turns text into a fixed-width vector. The built-in
//! [`HashingEmbedder`] needs no model files, so semantic re-ranking works out
//! of the box; any other model can be plugged in behind the same trait.

mod engine;
mod hashing;
mod table;

pub use engine::CachedEmbedder;
pub use hashing::HashingEmbedder;
pub use table::{member_text, EmbeddingTable};

use crate::error::EmbeddingError;

/// Text to vector
pub trait Embedder: Send + Sync {
    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Vector width
    fn dimension(&self) -> usize;

    /// Identifies the model; persisted vectors from another model are stale
    fn model_id(&self) -> String;
}

/// Cosine similarity; 0.0 for mismatched widths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
