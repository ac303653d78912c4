//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating unit-normalized text embeddings
///
/// Implementations must be deterministic for a fixed model version and return
/// the same dimensionality for every call within a process lifetime.
/// Construction fails fast if the underlying model is unavailable; there is no
/// degraded null provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts, one unit-length vector each
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(Error::embedding(
                "provider returned no vector for a one-text batch",
            ));
        }
        Ok(vectors.remove(0))
    }

    /// Embedding dimensionality
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Scale a vector to unit length so cosine similarity reduces to dot product
///
/// A zero vector is returned unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
