//! Common configuration used across the career guide service

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::IndexingConfig;

/// Default knowledge-base document
pub const DEFAULT_DOCUMENT_PATH: &str = "academicdisciplinesoutline.pdf";

/// Default directory of the persisted vector index
pub const DEFAULT_INDEX_DIR: &str = "vectorsdata/academic_index";

/// Retrieval and prompt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub top_k: usize,
    /// Number of prior turns included in the prompt
    pub history_window: usize,
    pub indexing: IndexingConfig,
    pub document_path: PathBuf,
    pub index_dir: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            history_window: 6,
            indexing: IndexingConfig::default(),
            document_path: PathBuf::from(DEFAULT_DOCUMENT_PATH),
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup
    ///
    /// Unparseable numbers fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let mut indexing = defaults.indexing.clone();
        indexing.chunk_size = number("CHUNK_SIZE", indexing.chunk_size).max(1);
        indexing.chunk_overlap = number("CHUNK_OVERLAP", indexing.chunk_overlap);
        if indexing.chunk_overlap >= indexing.chunk_size {
            indexing.chunk_overlap = indexing.chunk_size / 5;
        }
        indexing.batch_size = number("EMBEDDING_BATCH_SIZE", indexing.batch_size).max(1);

        Self {
            top_k: number("TOP_K", defaults.top_k).max(1),
            history_window: number("HISTORY_WINDOW", defaults.history_window),
            indexing,
            document_path: lookup("KNOWLEDGE_BASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.document_path),
            index_dir: lookup("INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
        }
    }
}
