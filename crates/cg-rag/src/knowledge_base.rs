//! Startup bootstrap of the knowledge-base index
//!
//! A persisted index is reused when it was built with the configured
//! embedding model. Otherwise the document is ingested, embedded and the
//! fresh index persisted. Any failure leaves an empty index so the service
//! still starts and answers ungrounded.

use cg_core::{EmbeddingProvider, Error, IndexingResult, RagConfig, Result, VectorIndex};

use crate::document_indexer::DocumentIngestor;
use crate::vector_store::FlatIndex;

/// Where the startup index came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    /// Loaded from the index directory
    Loaded,
    /// Built from the knowledge-base document
    Ingested(IndexingResult),
    /// No usable index; the reason is kept for the health report
    Empty(String),
}

impl IndexSource {
    pub fn describe(&self) -> String {
        match self {
            IndexSource::Loaded => "loaded".to_string(),
            IndexSource::Ingested(result) => format!("ingested {} chunks", result.chunks_indexed),
            IndexSource::Empty(reason) => format!("empty ({})", reason),
        }
    }
}

/// Load or build the index used by the answer engine
pub async fn prepare_index(
    config: &RagConfig,
    embedder: Option<&dyn EmbeddingProvider>,
) -> (FlatIndex, IndexSource) {
    let empty = || FlatIndex::new(&config.index_dir).with_batch_size(config.indexing.batch_size);

    let Some(embedder) = embedder else {
        tracing::warn!("no embedding provider configured, answers will be ungrounded");
        return (empty(), IndexSource::Empty("no embedding provider".to_string()));
    };

    let mut index = empty();
    match index.load() {
        Ok(()) if index.embedding_model() == Some(embedder.model_id()) && !index.is_empty() => {
            return (index, IndexSource::Loaded);
        }
        Ok(()) => {
            tracing::warn!(
                persisted = index.embedding_model().unwrap_or("unknown"),
                configured = embedder.model_id(),
                "persisted index does not match embedding model, rebuilding"
            );
        }
        Err(Error::IndexMissing(dir)) => {
            tracing::info!(dir = %dir, "no persisted index, building from document");
        }
        Err(e) => {
            tracing::warn!(error = %e, "persisted index unreadable, rebuilding");
        }
    }

    match reingest(config, embedder).await {
        Ok((index, result)) => (index, IndexSource::Ingested(result)),
        Err(e) => {
            tracing::error!(error = %e, "failed to build knowledge base index");
            (empty(), IndexSource::Empty(e.to_string()))
        }
    }
}

/// Ingest the document, embed every chunk and persist the index
pub async fn reingest(
    config: &RagConfig,
    embedder: &dyn EmbeddingProvider,
) -> Result<(FlatIndex, IndexingResult)> {
    let ingestor = DocumentIngestor::new(config.indexing.clone());
    let path = config.document_path.clone();

    let chunks = tokio::task::spawn_blocking(move || ingestor.ingest(&path))
        .await
        .map_err(|e| Error::Other(format!("ingestion task failed: {}", e)))??;

    if chunks.is_empty() {
        return Err(Error::InvalidInput(format!(
            "document {} contains no text",
            config.document_path.display()
        )));
    }

    let characters = chunks.iter().map(|c| c.text.chars().count()).sum();
    let chunks_indexed = chunks.len();

    let mut index =
        FlatIndex::new(&config.index_dir).with_batch_size(config.indexing.batch_size);
    index.build_index(chunks, embedder).await?;
    index.persist()?;

    let result = IndexingResult {
        source: config.document_path.display().to_string(),
        chunks_indexed,
        characters,
        embedding_model: embedder.model_id().to_string(),
    };

    tracing::info!(
        source = %result.source,
        chunks = result.chunks_indexed,
        model = %result.embedding_model,
        "knowledge base indexed"
    );

    Ok((index, result))
}
