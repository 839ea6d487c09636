//! Provider configuration

use serde::{Deserialize, Serialize};
use std::env;

use cg_core::{Error, Result};

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which backend produces embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Google Gemini embedding API
    Google,
    /// Local feature-hashing embedder, no credentials needed
    Hashing,
}

impl EmbeddingBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gemini" => Some(Self::Google),
            "hashing" | "hash" | "local" => Some(Self::Hashing),
            _ => None,
        }
    }
}

/// Text-generation backends, tried in configured order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Groq,
    Gemini,
}

impl GeneratorKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }
}

/// Configuration for all remote providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing)]
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_api_url: String,
    #[serde(skip_serializing)]
    pub google_api_key: Option<String>,
    pub gemini_api_url: String,
    pub gemini_embedding_model: String,
    pub gemini_model: String,
    pub embedding_backend: EmbeddingBackend,
    pub generators: Vec<GeneratorKind>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: "llama-3.1-8b-instant".to_string(),
            groq_api_url: DEFAULT_GROQ_API_URL.to_string(),
            google_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            gemini_embedding_model: "models/embedding-001".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
            embedding_backend: EmbeddingBackend::Google,
            generators: vec![GeneratorKind::Groq, GeneratorKind::Gemini],
            temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// Create configuration from environment variables
    ///
    /// Missing credentials are not an error here; they leave the matching
    /// provider unconfigured.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let generators = value("GENERATION_PROVIDERS")
            .map(|list| {
                list.split(',')
                    .filter_map(GeneratorKind::parse)
                    .collect::<Vec<_>>()
            })
            .unwrap_or(defaults.generators);

        Self {
            groq_api_key: value("GROQ_API_KEY"),
            groq_model: value("GROQ_MODEL").unwrap_or(defaults.groq_model),
            groq_api_url: value("GROQ_API_URL").unwrap_or(defaults.groq_api_url),
            google_api_key: value("GOOGLE_API_KEY").or_else(|| value("GEMINI_API_KEY")),
            gemini_api_url: value("GEMINI_API_URL").unwrap_or(defaults.gemini_api_url),
            gemini_embedding_model: value("GEMINI_EMBEDDING_MODEL")
                .unwrap_or(defaults.gemini_embedding_model),
            gemini_model: value("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            embedding_backend: value("EMBEDDING_PROVIDER")
                .and_then(|v| EmbeddingBackend::parse(&v))
                .unwrap_or(defaults.embedding_backend),
            generators,
            temperature: value("LLM_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            timeout_secs: value("PROVIDER_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn groq_key(&self) -> Result<&str> {
        self.groq_api_key
            .as_deref()
            .ok_or_else(|| Error::ConfigMissing("GROQ_API_KEY not found".to_string()))
    }

    pub fn google_key(&self) -> Result<&str> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| Error::ConfigMissing("GOOGLE_API_KEY not found".to_string()))
    }
}
