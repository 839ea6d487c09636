//! Flat (brute-force) vector index persisted as JSON

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use cg_core::{
    ChunkId, EmbeddingProvider, Error, KnowledgeChunk, Result, ScoredChunk, VectorIndex,
};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: KnowledgeChunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    embedding_model: String,
    dimension: usize,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

/// In-memory cosine index over knowledge chunks
///
/// Small enough documents (a few thousand chunks) make a linear scan
/// cheaper than maintaining an ANN structure.
pub struct FlatIndex {
    dir: PathBuf,
    batch_size: usize,
    entries: Vec<IndexEntry>,
    embedding_model: Option<String>,
    dimension: usize,
    built_at: Option<DateTime<Utc>>,
}

impl FlatIndex {
    /// Create an empty index that persists into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            batch_size: 32,
            entries: Vec::new(),
            embedding_model: None,
            dimension: 0,
            built_at: None,
        }
    }

    /// Set how many chunks are embedded per provider request
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Create an index and load the persisted copy from `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let mut index = Self::new(dir);
        index.load()?;
        Ok(index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// `1 - cos(a, b)`; zero vectors are treated as orthogonal
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f32, 0.0f32, 0.0f32), |acc, (x, y)| {
            (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
        });

        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn build_index(
        &mut self,
        chunks: Vec<KnowledgeChunk>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<()> {
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension = 0;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::ProviderUnavailable(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if dimension == 0 {
                    dimension = embedding.len();
                } else if embedding.len() != dimension {
                    return Err(Error::ProviderUnavailable(format!(
                        "inconsistent embedding dimension: expected {}, got {}",
                        dimension,
                        embedding.len()
                    )));
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }

            tracing::debug!(embedded = entries.len(), total = chunks.len(), "embedded chunk batch");
        }

        self.entries = entries;
        self.dimension = dimension;
        self.embedding_model = Some(embedder.model_id().to_string());
        self.built_at = Some(Utc::now());
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(Error::InvalidInput(format!(
                "query vector has dimension {}, index has {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (position, Self::cosine_distance(vector, &entry.embedding))
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                distance,
            })
            .collect())
    }

    fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let persisted = PersistedIndex {
            embedding_model: self.embedding_model.clone().unwrap_or_default(),
            dimension: self.dimension,
            built_at: self.built_at.unwrap_or_else(Utc::now),
            entries: self.entries.clone(),
        };

        let tmp_path = self.dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp_path, serde_json::to_vec(&persisted)?)?;
        fs::rename(&tmp_path, self.index_path())?;

        tracing::info!(path = %self.index_path().display(), chunks = self.entries.len(), "vector index saved");
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        let path = self.index_path();
        if !path.exists() {
            return Err(Error::IndexMissing(self.dir.display().to_string()));
        }

        let content = fs::read(&path)?;
        let persisted: PersistedIndex = serde_json::from_slice(&content)?;

        self.entries = persisted.entries;
        self.dimension = persisted.dimension;
        self.embedding_model = Some(persisted.embedding_model);
        self.built_at = Some(persisted.built_at);

        tracing::info!(path = %path.display(), chunks = self.entries.len(), "vector index loaded");
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn chunk(&self, id: ChunkId) -> Option<&KnowledgeChunk> {
        self.entries
            .get(id)
            .filter(|entry| entry.chunk.id == id)
            .or_else(|| self.entries.iter().find(|entry| entry.chunk.id == id))
            .map(|entry| &entry.chunk)
    }

    fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }
}
