//! Google Gemini client: embeddings and text generation
//!
//! Endpoints:
//! - `POST {base}/{embedding_model}:embedContent`
//! - `POST {base}/{embedding_model}:batchEmbedContents` (up to 100 inputs)
//! - `POST {base}/models/{model}:generateContent`
//!
//! Auth is the `x-goog-api-key` header.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cg_core::{EmbeddingProvider, Error, GenerationResult, LLMProvider, Result};

use crate::config::ProviderConfig;
use crate::http::{build_client, check_status, map_send_error};

const PROVIDER: &str = "gemini";

/// Maximum number of inputs accepted by `batchEmbedContents`
const MAX_BATCH_SIZE: usize = 100;

/// Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_url: String,
    embedding_model: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedContentRequest {
    pub model: String,
    pub content: Content,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchEmbedRequest {
    pub requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GeminiClient {
    /// Create a client; fails with `ConfigMissing` without `GOOGLE_API_KEY`
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.google_key()?.to_string();
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            api_url: config.gemini_api_url.trim_end_matches('/').to_string(),
            embedding_model: config.gemini_embedding_model.clone(),
            model: config.gemini_model.clone(),
            temperature: config.temperature,
        })
    }

    fn text_content(text: &str, role: Option<&str>) -> Content {
        Content {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    pub(crate) fn embed_request(&self, text: &str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: self.embedding_model.clone(),
            content: Self::text_content(text, None),
        }
    }

    pub(crate) fn generate_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Self::text_content(prompt, Some("user"))],
            generation_config: GenerationParams {
                temperature: self.temperature,
            },
        }
    }

    /// Join the text parts of the first candidate
    pub(crate) fn parse_generation(response: GenerateContentResponse) -> Result<(String, Option<u32>)> {
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(Error::ProviderUnavailable(
                "Empty response from Gemini API".to_string(),
            ));
        }

        Ok((text, response.usage_metadata.and_then(|u| u.total_token_count)))
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error(PROVIDER, e))?;

        check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.api_url, self.embedding_model);
        let response: EmbedContentResponse = self.post(&url, &self.embed_request(text)).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/{}:batchEmbedContents", self.api_url, self.embedding_model);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let request = BatchEmbedRequest {
                requests: batch.iter().map(|text| self.embed_request(text)).collect(),
            };
            let response: BatchEmbedResponse = self.post(&url, &request).await?;
            if response.embeddings.len() != batch.len() {
                return Err(Error::ProviderUnavailable(format!(
                    "Gemini returned {} embeddings for {} inputs",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(vectors)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let response: GenerateContentResponse =
            self.post(&url, &self.generate_request(prompt)).await?;
        let (text, tokens_used) = Self::parse_generation(response)?;

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
