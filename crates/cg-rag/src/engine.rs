//! Answer orchestration: retrieve, prompt, generate

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use cg_core::{
    AnswerMode, AnswerRequest, AnswerResult, EmbeddingProvider, LLMProvider, RAGEngine, RagConfig,
    RagStats, Result, ScoredChunk, VectorIndex,
};

use crate::prompt::build_prompt;

/// Returned when no generator could be configured
pub const UNAVAILABLE_MESSAGE: &str =
    "AI service is not available. Please check your API keys and dependencies.";

/// Returned when retrieval or generation fails for a question
pub const FAILURE_MESSAGE: &str =
    "I apologize, but I'm having trouble processing your question. Please try again.";

/// Returned for blank questions
pub const EMPTY_QUESTION_MESSAGE: &str =
    "Please ask a question so I can help with your career planning.";

/// Career counseling RAG engine
///
/// Every component is optional except the index, which may be empty. The
/// engine answers with whatever is available and never surfaces an error
/// to the caller.
pub struct CareerRagEngine {
    generator: Option<Arc<dyn LLMProvider>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Arc<dyn VectorIndex>,
    config: RagConfig,
}

impl CareerRagEngine {
    /// Create an engine without providers
    pub fn new(index: Arc<dyn VectorIndex>, config: RagConfig) -> Self {
        Self {
            generator: None,
            embedder: None,
            index,
            config,
        }
    }

    pub fn with_generator(mut self, generator: Option<Arc<dyn LLMProvider>>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_embedder(mut self, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    async fn generate(
        &self,
        generator: &dyn LLMProvider,
        request: &AnswerRequest,
    ) -> Result<AnswerResult> {
        let context = self.retrieve(&request.question).await?;

        let skip = request.history.len().saturating_sub(self.config.history_window);
        let history = &request.history[skip..];

        let prompt = build_prompt(&request.question, &context, request.profile.as_ref(), history);
        let generation = generator.generate(&prompt).await?;

        let response_text = generation.text.trim().to_string();
        if response_text.is_empty() {
            return Ok(AnswerResult::degraded(FAILURE_MESSAGE));
        }

        let mode = if context.is_empty() {
            AnswerMode::Ungrounded
        } else {
            AnswerMode::Grounded
        };

        Ok(AnswerResult {
            response_text,
            used_context: context.iter().map(|scored| scored.chunk.id).collect(),
            mode,
        })
    }
}

#[async_trait]
impl RAGEngine for CareerRagEngine {
    async fn answer(&self, request: AnswerRequest) -> AnswerResult {
        let started = Instant::now();

        if request.question.trim().is_empty() {
            return AnswerResult::degraded(EMPTY_QUESTION_MESSAGE);
        }

        let Some(generator) = self.generator.as_deref() else {
            tracing::warn!(session_id = %request.session_id, "no generator configured");
            return AnswerResult::degraded(UNAVAILABLE_MESSAGE);
        };

        let result = match self.generate(generator, &request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    session_id = %request.session_id,
                    error = %e,
                    provider_failure = e.is_degradable(),
                    "failed to answer question"
                );
                AnswerResult::degraded(FAILURE_MESSAGE)
            }
        };

        tracing::info!(
            session_id = %request.session_id,
            mode = ?result.mode,
            chunks = result.used_context.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );

        result
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let Some(embedder) = self.embedder.as_deref() else {
            return Ok(Vec::new());
        };
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = embedder.embed(question).await?;
        // A zero vector is equidistant from every chunk
        if vector.iter().all(|v| *v == 0.0) {
            tracing::debug!("query embedding has no signal, skipping retrieval");
            return Ok(Vec::new());
        }
        self.index.query(&vector, self.config.top_k)
    }

    fn stats(&self) -> RagStats {
        RagStats {
            generator: self.generator.as_ref().map(|g| g.name().to_string()),
            embedder: self.embedder.as_ref().map(|e| e.model_id().to_string()),
            indexed_chunks: self.index.len(),
            top_k: self.config.top_k,
        }
    }

    fn is_ready(&self) -> bool {
        self.generator.is_some()
    }
}
