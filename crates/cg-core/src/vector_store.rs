//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChunkId, EmbeddingProvider, KnowledgeChunk, Result};

/// A retrieved chunk with its distance to the query vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    /// Cosine distance, `1 - cosine_similarity`; smaller is closer
    pub distance: f32,
}

/// Trait for the embedding index backing retrieval
///
/// The index is written once at ingestion and read-only while serving.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed `chunks` and replace the index contents with them
    async fn build_index(
        &mut self,
        chunks: Vec<KnowledgeChunk>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<()>;

    /// Return the `k` nearest chunks, closest first; ties keep insertion order
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Write the index to durable storage, replacing any previous copy
    fn persist(&self) -> Result<()>;

    /// Replace the in-memory contents with the persisted copy
    fn load(&mut self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn chunk(&self, id: ChunkId) -> Option<&KnowledgeChunk>;

    /// Embedding model the vectors were produced with, if built
    fn embedding_model(&self) -> Option<&str>;
}
