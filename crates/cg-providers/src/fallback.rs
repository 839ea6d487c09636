//! Ordered chain of text-generation providers

use async_trait::async_trait;
use std::sync::Arc;

use cg_core::{Error, GenerationResult, LLMProvider, Result};

/// Tries each provider once, in order, and returns the first success
pub struct FallbackGenerator {
    providers: Vec<Arc<dyn LLMProvider>>,
    name: String,
}

impl FallbackGenerator {
    pub fn new(providers: Vec<Arc<dyn LLMProvider>>) -> Self {
        let name = providers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(">");
        Self { providers, name }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LLMProvider for FallbackGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let mut last_error =
            Error::ConfigMissing("no text-generation provider configured".to_string());

        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "generation provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_id(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.model_id())
            .unwrap_or("none")
    }
}
