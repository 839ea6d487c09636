//! RAG (Retrieval-Augmented Generation) engine trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatTurn, ChunkId, Result, ScoredChunk, UserProfile};

/// Question to answer, with the conversational context around it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    pub session_id: String,
    pub profile: Option<UserProfile>,
    /// Prior turns of the session, oldest first
    pub history: Vec<ChatTurn>,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            profile: None,
            history: Vec::new(),
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// How an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// Generated with retrieved context
    Grounded,
    /// Generated from the prompt alone; no context was available
    Ungrounded,
    /// Static message; a provider was missing or failed
    Degraded,
}

/// Answer returned to the chat flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub response_text: String,
    /// Ids of the chunks placed in the prompt, in retrieval order
    pub used_context: Vec<ChunkId>,
    pub mode: AnswerMode,
}

impl AnswerResult {
    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            response_text: message.into(),
            used_context: Vec::new(),
            mode: AnswerMode::Degraded,
        }
    }
}

/// Snapshot of the engine's components for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagStats {
    pub generator: Option<String>,
    pub embedder: Option<String>,
    pub indexed_chunks: usize,
    pub top_k: usize,
}

/// Trait for RAG engines
///
/// `answer` never fails: every provider or index problem is converted into
/// an ungrounded or degraded answer.
#[async_trait]
pub trait RAGEngine: Send + Sync {
    /// Answer a question
    async fn answer(&self, request: AnswerRequest) -> AnswerResult;

    /// Retrieve the chunks most relevant to a question
    async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>>;

    fn stats(&self) -> RagStats;

    /// Check whether a generator is configured
    fn is_ready(&self) -> bool;
}
