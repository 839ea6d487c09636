//! Retrieval-augmented answer engine for the career guide service
//!
//! This crate provides the document ingestor, the flat vector index, the
//! knowledge-base bootstrap and the answer orchestrator.

mod document_indexer;
mod engine;
mod knowledge_base;
mod prompt;
mod vector_store;

#[cfg(test)]
mod tests;

pub use document_indexer::{DocumentIngestor, load_document, normalize_text};
pub use engine::{CareerRagEngine, EMPTY_QUESTION_MESSAGE, FAILURE_MESSAGE, UNAVAILABLE_MESSAGE};
pub use knowledge_base::{IndexSource, prepare_index, reingest};
pub use prompt::{CONTEXT_SEPARATOR, build_prompt};
pub use vector_store::FlatIndex;

// Re-export core types for convenience
pub use cg_core::{
    AnswerMode, AnswerRequest, AnswerResult, EmbeddingProvider, Error, IndexingConfig,
    IndexingResult, KnowledgeChunk, RAGEngine, RagConfig, Result, ScoredChunk, VectorIndex,
};
