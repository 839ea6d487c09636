//! Answer engine and index bootstrap tests

#[cfg(test)]
mod engine_tests {
    use crate::{
        AnswerMode, AnswerRequest, CareerRagEngine, EMPTY_QUESTION_MESSAGE, EmbeddingProvider,
        Error, FAILURE_MESSAGE, FlatIndex, IndexSource, KnowledgeChunk, RAGEngine, RagConfig,
        Result, UNAVAILABLE_MESSAGE, VectorIndex, prepare_index,
    };
    use async_trait::async_trait;
    use cg_core::{ChatTurn, GenerationResult, LLMProvider, Role, UserProfile};
    use cg_providers::HashingEmbedder;
    use insta::assert_yaml_snapshot;
    use std::sync::{Arc, Mutex};

    /// Generator that records every prompt it receives
    struct RecordingGenerator {
        reply: std::result::Result<&'static str, &'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingGenerator {
        fn replying(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(reason: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(GenerationResult {
                    text: text.to_string(),
                    model_id: "recorder".to_string(),
                    provider: "recorder".to_string(),
                    tokens_used: Some(42),
                }),
                Err(reason) => Err(Error::ProviderUnavailable(reason.to_string())),
            }
        }

        fn name(&self) -> &str {
            "recorder"
        }

        fn model_id(&self) -> &str {
            "recorder"
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::Network("connection reset".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }

        fn model_id(&self) -> &str {
            "broken-1"
        }
    }

    const OUTLINE: [&str; 4] = [
        "Medical and health sciences: MBBS, BDS, pharmacy, nursing and allied health programs after FSC Pre-Medical.",
        "Commerce and management: accounting, finance, marketing and business administration degrees.",
        "Life sciences: biology, biotechnology, genetics, microbiology and biochemistry research careers.",
        "Engineering: civil, mechanical, electrical and software engineering after FSC Pre-Engineering.",
    ];

    async fn outline_index(embedder: &HashingEmbedder) -> Arc<dyn VectorIndex> {
        let chunks = OUTLINE
            .iter()
            .enumerate()
            .map(|(id, text)| KnowledgeChunk {
                id,
                text: text.to_string(),
                source_offset: id * 120,
            })
            .collect();
        let mut index = FlatIndex::new("unused");
        index.build_index(chunks, embedder).await.unwrap();
        Arc::new(index)
    }

    fn config(top_k: usize, history_window: usize) -> RagConfig {
        RagConfig {
            top_k,
            history_window,
            ..RagConfig::default()
        }
    }

    #[tokio::test]
    async fn test_grounded_answer_with_profile() {
        let embedder = HashingEmbedder::default();
        let generator = RecordingGenerator::replying("  Consider MBBS, pharmacy or biotechnology.\n");
        let engine = CareerRagEngine::new(outline_index(&embedder).await, config(2, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>))
            .with_embedder(Some(Arc::new(embedder) as Arc<dyn EmbeddingProvider>));

        let request = AnswerRequest::new(
            "What career options are available after FSC Pre-Medical?",
            "session-1",
        )
        .with_profile(UserProfile::new("FSC Pre-Medical", ["biology"]));

        let result = engine.answer(request).await;
        assert_eq!(result.mode, AnswerMode::Grounded);
        assert_eq!(result.response_text, "Consider MBBS, pharmacy or biotechnology.");
        assert_eq!(result.used_context.len(), 2);
        assert_eq!(result.used_context[0], 0);

        let prompt = generator.last_prompt();
        assert!(prompt.contains("Context:\n"));
        assert!(prompt.contains(OUTLINE[0]));
        assert!(prompt.contains("Educational background: FSC Pre-Medical"));
        assert!(prompt.contains("Interests: biology"));
        assert!(prompt.ends_with(
            "Question:\nWhat career options are available after FSC Pre-Medical?\n\nAnswer:"
        ));
    }

    #[tokio::test]
    async fn test_empty_index_answers_ungrounded() {
        let generator = RecordingGenerator::replying("General advice");
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>))
            .with_embedder(Some(Arc::new(HashingEmbedder::default()) as Arc<dyn EmbeddingProvider>));

        let result = engine.answer(AnswerRequest::new("Is law a good career?", "s")).await;
        assert_eq!(result.mode, AnswerMode::Ungrounded);
        assert!(result.used_context.is_empty());
        assert!(generator.last_prompt().contains("Answer the following question about career guidance:"));
    }

    #[tokio::test]
    async fn test_missing_embedder_answers_ungrounded() {
        let embedder = HashingEmbedder::default();
        let generator = RecordingGenerator::replying("General advice");
        let engine = CareerRagEngine::new(outline_index(&embedder).await, config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>));

        let result = engine.answer(AnswerRequest::new("Engineering?", "s")).await;
        assert_eq!(result.mode, AnswerMode::Ungrounded);
        assert!(!generator.last_prompt().contains("Context:"));
    }

    #[tokio::test]
    async fn test_question_without_words_gets_no_context() {
        let embedder = HashingEmbedder::default();
        let generator = RecordingGenerator::replying("Could you rephrase that?");
        let engine = CareerRagEngine::new(outline_index(&embedder).await, config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>))
            .with_embedder(Some(Arc::new(embedder) as Arc<dyn EmbeddingProvider>));

        assert!(engine.retrieve("?!").await.unwrap().is_empty());

        let result = engine.answer(AnswerRequest::new("???", "s")).await;
        assert_eq!(result.mode, AnswerMode::Ungrounded);
        assert!(result.used_context.is_empty());
        assert!(!generator.last_prompt().contains("Context:"));
    }

    #[tokio::test]
    async fn test_missing_generator_is_unavailable() {
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 6));
        assert!(!engine.is_ready());

        let result = engine.answer(AnswerRequest::new("Hello?", "s")).await;
        assert_yaml_snapshot!(result, @r###"
        ---
        response_text: AI service is not available. Please check your API keys and dependencies.
        used_context: []
        mode: degraded
        "###);
        assert_eq!(result.response_text, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_generator_failure_is_degraded() {
        let generator = RecordingGenerator::failing("rate limited");
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>));

        let result = engine.answer(AnswerRequest::new("Hello?", "s")).await;
        assert_eq!(result.mode, AnswerMode::Degraded);
        assert_eq!(result.response_text, FAILURE_MESSAGE);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_generation_is_degraded() {
        let generator = RecordingGenerator::replying("   \n");
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 6))
            .with_generator(Some(generator as Arc<dyn LLMProvider>));

        let result = engine.answer(AnswerRequest::new("Hello?", "s")).await;
        assert_eq!(result.response_text, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_generation() {
        let embedder = HashingEmbedder::default();
        let generator = RecordingGenerator::replying("unused");
        let engine = CareerRagEngine::new(outline_index(&embedder).await, config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>))
            .with_embedder(Some(Arc::new(BrokenEmbedder) as Arc<dyn EmbeddingProvider>));

        let result = engine.answer(AnswerRequest::new("Engineering?", "s")).await;
        assert_eq!(result.response_text, FAILURE_MESSAGE);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let generator = RecordingGenerator::replying("unused");
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 6))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>));

        let result = engine.answer(AnswerRequest::new(" \t ", "s")).await;
        assert_eq!(result.response_text, EMPTY_QUESTION_MESSAGE);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_window_keeps_latest_turns() {
        let generator = RecordingGenerator::replying("ok");
        let engine = CareerRagEngine::new(Arc::new(FlatIndex::new("unused")), config(3, 2))
            .with_generator(Some(generator.clone() as Arc<dyn LLMProvider>));

        let history = vec![
            ChatTurn::new("s", Role::User, "first question"),
            ChatTurn::new("s", Role::Assistant, "first answer"),
            ChatTurn::new("s", Role::User, "second question"),
            ChatTurn::new("s", Role::Assistant, "second answer"),
        ];
        engine
            .answer(AnswerRequest::new("third question", "s").with_history(history))
            .await;

        let prompt = generator.last_prompt();
        assert!(!prompt.contains("first question"));
        assert!(prompt.contains("User: second question\nAssistant: second answer"));
    }

    #[tokio::test]
    async fn test_retrieval_is_deterministic_across_builds() {
        let embedder = HashingEmbedder::default();
        let first = outline_index(&embedder).await;
        let second = outline_index(&embedder).await;

        let query = embedder.embed_text("software engineering careers");
        let a: Vec<_> = first.query(&query, 4).unwrap().into_iter().map(|r| r.chunk.id).collect();
        let b: Vec<_> = second.query(&query, 4).unwrap().into_iter().map(|r| r.chunk.id).collect();
        assert_eq!(a, b);
        assert_eq!(a[0], 3);
    }

    #[tokio::test]
    async fn test_stats_report_components() {
        let embedder = HashingEmbedder::default();
        let engine = CareerRagEngine::new(outline_index(&embedder).await, config(3, 6))
            .with_generator(Some(RecordingGenerator::replying("ok") as Arc<dyn LLMProvider>))
            .with_embedder(Some(Arc::new(embedder) as Arc<dyn EmbeddingProvider>));

        let stats = engine.stats();
        assert_eq!(stats.generator.as_deref(), Some("recorder"));
        assert_eq!(stats.embedder.as_deref(), Some("hashing-384"));
        assert_eq!(stats.indexed_chunks, 4);
        assert_eq!(stats.top_k, 3);
    }

    fn bootstrap_config(dir: &std::path::Path) -> RagConfig {
        let document = dir.join("outline.txt");
        std::fs::write(&document, OUTLINE.join("\n\n")).unwrap();

        let mut config = config(3, 6);
        config.document_path = document;
        config.index_dir = dir.join("index");
        config.indexing.chunk_size = 200;
        config.indexing.chunk_overlap = 20;
        config
    }

    #[tokio::test]
    async fn test_prepare_index_builds_then_loads() {
        let dir = tempfile::tempdir().unwrap();
        let config = bootstrap_config(dir.path());
        let embedder = HashingEmbedder::default();

        let (built, source) = prepare_index(&config, Some(&embedder as &dyn EmbeddingProvider)).await;
        let IndexSource::Ingested(result) = &source else {
            panic!("expected a fresh ingestion, got {:?}", source);
        };
        assert_eq!(result.chunks_indexed, built.len());
        assert_eq!(result.embedding_model, "hashing-384");
        assert!(config.index_dir.join("index.json").exists());

        let (loaded, source) = prepare_index(&config, Some(&embedder as &dyn EmbeddingProvider)).await;
        assert_eq!(source, IndexSource::Loaded);
        assert_eq!(loaded.len(), built.len());
    }

    #[tokio::test]
    async fn test_prepare_index_rebuilds_for_new_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = bootstrap_config(dir.path());

        prepare_index(&config, Some(&HashingEmbedder::new(64) as &dyn EmbeddingProvider)).await;
        let (index, source) = prepare_index(&config, Some(&HashingEmbedder::new(128) as &dyn EmbeddingProvider)).await;
        assert!(matches!(source, IndexSource::Ingested(_)));
        assert_eq!(index.embedding_model(), Some("hashing-128"));
    }

    #[tokio::test]
    async fn test_prepare_index_without_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(3, 6);
        config.document_path = dir.path().join("missing.pdf");
        config.index_dir = dir.path().join("index");

        let (index, source) = prepare_index(&config, Some(&HashingEmbedder::default() as &dyn EmbeddingProvider)).await;
        assert!(index.is_empty());
        assert!(matches!(source, IndexSource::Empty(_)));
    }

    #[tokio::test]
    async fn test_prepare_index_without_embedder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = bootstrap_config(dir.path());

        let (index, source) = prepare_index(&config, None).await;
        assert!(index.is_empty());
        assert_eq!(source, IndexSource::Empty("no embedding provider".to_string()));
    }
}
