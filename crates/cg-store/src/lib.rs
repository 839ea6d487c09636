//! User and chat history storage for the career guide service
//!
//! `SqliteStore` is the durable backend. `MemoryStore` keeps everything for
//! the lifetime of the process and is used when the database cannot be
//! opened.

mod memory;
mod password;
mod sqlite;


use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use password::{hash_password, verify_password};
pub use sqlite::{DbPool, SqliteStore};

pub use cg_core::{Error, HistoryStore, Result, UserStore};

/// Default database file
pub const DEFAULT_DATABASE_PATH: &str = "career_counseling.db";

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

impl StoreConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            database_path: lookup("DATABASE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
        }
    }
}

/// The user and history stores, backed by the same storage
#[derive(Clone)]
pub struct Stores {
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn sqlite(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            history: store.clone(),
            users: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            history: store.clone(),
            users: store,
        }
    }

    /// Backend name reported by health checks
    pub fn backend_name(&self) -> &'static str {
        self.history.backend_name()
    }
}

/// Open the configured database, falling back to memory on failure
pub fn open_stores(config: &StoreConfig) -> Stores {
    match SqliteStore::open(&config.database_path) {
        Ok(store) => Stores::sqlite(store),
        Err(e) => {
            tracing::warn!(
                path = %config.database_path.display(),
                error = %e,
                "database unavailable, chat history will not survive a restart"
            );
            Stores::memory()
        }
    }
}
