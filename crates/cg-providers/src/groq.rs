//! Groq chat-completions client
//!
//! Groq serves an OpenAI-compatible API, so pointing `GROQ_API_URL` at any
//! other compatible endpoint works as well.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cg_core::{Error, GenerationResult, LLMProvider, Result};

use crate::config::ProviderConfig;
use crate::http::{build_client, check_status, map_send_error};

const PROVIDER: &str = "groq";

/// Groq text-generation client
pub struct GroqClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u32>,
}

impl GroqClient {
    /// Model constants
    pub const LLAMA_3_1_8B_INSTANT: &'static str = "llama-3.1-8b-instant";

    /// Create a client; fails with `ConfigMissing` without `GROQ_API_KEY`
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.groq_key()?.to_string();
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            api_url: config.groq_api_url.trim_end_matches('/').to_string(),
            model: config.groq_model.clone(),
            temperature: config.temperature,
        })
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model = model_id.into();
        self
    }

    pub(crate) fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        }
    }

    /// Extract the completion text, rejecting empty answers
    pub(crate) fn parse_response(response: ChatCompletionResponse) -> Result<(String, Option<u32>)> {
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::ProviderUnavailable(
                "Empty response from Groq API".to_string(),
            ));
        }

        Ok((text, response.usage.and_then(|u| u.total_tokens)))
    }
}

#[async_trait]
impl LLMProvider for GroqClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let url = format!("{}/chat/completions", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| map_send_error(PROVIDER, e))?;

        let body: ChatCompletionResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let (text, tokens_used) = Self::parse_response(body)?;
        tracing::debug!(model = %self.model, tokens_used = ?tokens_used, "groq generation finished");

        Ok(GenerationResult {
            text,
            model_id: self.model.clone(),
            provider: PROVIDER.to_string(),
            tokens_used,
        })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
