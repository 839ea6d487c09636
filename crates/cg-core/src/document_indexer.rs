//! Knowledge chunk types and ingestion configuration

use serde::{Deserialize, Serialize};

/// Zero-based position of a chunk in ingestion order
pub type ChunkId = usize;

/// A bounded substring of the knowledge-base document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: ChunkId,
    pub text: String,
    /// Character offset of the chunk in the normalized document text
    pub source_offset: usize,
}

/// Result of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingResult {
    pub source: String,
    pub chunks_indexed: usize,
    pub characters: usize,
    pub embedding_model: String,
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 400,
            batch_size: 32,
        }
    }
}
