//! Core traits and types for the career guide service
//!
//! This crate defines the capability interfaces (LLM generation, embeddings,
//! vector index, history and user stores, RAG engine) and the data model
//! shared by every other crate in the workspace.

pub mod document_indexer;
pub mod embedding;
pub mod error;
pub mod history;
pub mod llm;
pub mod rag;
pub mod types;
pub mod vector_store;


pub use document_indexer::{ChunkId, IndexingConfig, IndexingResult, KnowledgeChunk};
pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use history::{
    ChatSession, ChatTurn, HistoryStore, NewUser, Role, User, UserId, UserProfile, UserStore,
    DEFAULT_SESSION_NAME,
};
pub use llm::{GenerationResult, LLMProvider};
pub use rag::{AnswerMode, AnswerRequest, AnswerResult, RAGEngine, RagStats};
pub use types::RagConfig;
pub use vector_store::{ScoredChunk, VectorIndex};
