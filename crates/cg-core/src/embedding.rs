//! Embedding provider trait

use async_trait::async_trait;

use crate::Result;

/// Trait for embedding backends
///
/// The same provider must be used for ingestion and for query embedding;
/// `model_id` is persisted with the index so a mismatch can be detected.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn name(&self) -> &str;

    fn model_id(&self) -> &str;
}
