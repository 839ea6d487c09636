//! Embedding and text-generation providers for the career guide service
//!
//! This crate provides the concrete implementations of the `LLMProvider`
//! and `EmbeddingProvider` traits and the configuration-driven selection
//! between them.

mod config;
mod fallback;
mod gemini;
mod groq;
mod hashing;
mod http;
mod registry;


pub use config::{EmbeddingBackend, GeneratorKind, ProviderConfig};
pub use fallback::FallbackGenerator;
pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use hashing::HashingEmbedder;
pub use registry::{build_embedder, build_generator};

// Re-export core types for convenience
pub use cg_core::{EmbeddingProvider, Error, GenerationResult, LLMProvider, Result};
