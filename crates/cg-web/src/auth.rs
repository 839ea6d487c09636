//! Bearer-token registry
//!
//! Tokens are random v4 uuids held in memory; they stop working when the
//! process exits. Each token also tracks the caller's active chat session.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use cg_core::UserId;

/// Identity and active session behind a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub username: String,
    pub active_session: String,
}

#[derive(Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, AuthSession>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token
    pub async fn issue(&self, session: AuthSession) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.write().await.insert(token.clone(), session);
        token
    }

    pub async fn lookup(&self, token: &str) -> Option<AuthSession> {
        self.tokens.read().await.get(token).cloned()
    }

    pub async fn set_active_session(&self, token: &str, session_id: &str) {
        if let Some(session) = self.tokens.write().await.get_mut(token) {
            session.active_session = session_id.to_string();
        }
    }

    /// Drop a token; returns false when it was unknown
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }
}

/// Extract the token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
