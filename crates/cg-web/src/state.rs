//! Shared application state

use std::sync::Arc;

use cg_core::{HistoryStore, RAGEngine, UserStore};
use cg_store::Stores;

use crate::auth::TokenRegistry;

/// Everything a handler needs, cheap to clone per request
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RAGEngine>,
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<TokenRegistry>,
    /// Prior turns passed to the engine with each question
    pub history_window: usize,
    /// Human-readable origin of the knowledge-base index
    pub index_status: String,
}

impl AppState {
    pub fn new(engine: Arc<dyn RAGEngine>, stores: Stores, history_window: usize) -> Self {
        Self {
            engine,
            history: stores.history,
            users: stores.users,
            auth: Arc::new(TokenRegistry::new()),
            history_window,
            index_status: "unknown".to_string(),
        }
    }

    pub fn with_index_status(mut self, status: impl Into<String>) -> Self {
        self.index_status = status.into();
        self
    }
}
