//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Result;

/// Result of a text generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub provider: String,
    pub tokens_used: Option<u32>,
}

/// Trait for text-generation providers (e.g., Groq, Gemini)
///
/// A provider is a pure capability boundary: one prompt in, one completion
/// out. Retry and degradation policy belong to the caller.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str) -> Result<GenerationResult>;

    /// Short provider name used in logs and health output
    fn name(&self) -> &str;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
