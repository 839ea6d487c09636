//! Configuration-driven provider selection
//!
//! Selection happens once at startup. A provider whose credential is missing
//! is left out; the engine degrades instead of failing.

use std::sync::Arc;

use cg_core::{EmbeddingProvider, LLMProvider};

use crate::config::{EmbeddingBackend, GeneratorKind, ProviderConfig};
use crate::{FallbackGenerator, GeminiClient, GroqClient, HashingEmbedder};

/// Build the text generator, or `None` when no provider is usable
pub fn build_generator(config: &ProviderConfig) -> Option<Arc<dyn LLMProvider>> {
    let mut providers: Vec<Arc<dyn LLMProvider>> = Vec::new();

    for kind in &config.generators {
        let built: cg_core::Result<Arc<dyn LLMProvider>> = match kind {
            GeneratorKind::Groq => GroqClient::new(config).map(|c| Arc::new(c) as Arc<dyn LLMProvider>),
            GeneratorKind::Gemini => {
                GeminiClient::new(config).map(|c| Arc::new(c) as Arc<dyn LLMProvider>)
            }
        };

        match built {
            Ok(provider) => {
                tracing::info!(provider = provider.name(), model = provider.model_id(), "generation provider ready");
                providers.push(provider);
            }
            Err(e) => tracing::warn!(provider = ?kind, error = %e, "generation provider unavailable"),
        }
    }

    match providers.len() {
        0 => None,
        1 => providers.pop(),
        _ => Some(Arc::new(FallbackGenerator::new(providers))),
    }
}

/// Build the embedder, or `None` when the configured backend is unusable
pub fn build_embedder(config: &ProviderConfig) -> Option<Arc<dyn EmbeddingProvider>> {
    match config.embedding_backend {
        EmbeddingBackend::Hashing => Some(Arc::new(HashingEmbedder::default())),
        EmbeddingBackend::Google => match GeminiClient::new(config) {
            Ok(client) => {
                tracing::info!(model = %config.gemini_embedding_model, "embedding provider ready");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding provider unavailable");
                None
            }
        },
    }
}
