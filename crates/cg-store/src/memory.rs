//! Process-lifetime store used when SQLite is unavailable

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use cg_core::{
    ChatSession, ChatTurn, DEFAULT_SESSION_NAME, Error, HistoryStore, NewUser, Result, User,
    UserId, UserProfile, UserStore,
};

use crate::password::{hash_password, verify_password};

struct StoredUser {
    user: User,
    password_hash: String,
}

struct StoredSession {
    session: ChatSession,
    turns: Vec<ChatTurn>,
    /// Monotonic touch counter, breaks `updated_at` ties
    touched: u64,
}

#[derive(Default)]
struct Inner {
    users: Vec<StoredUser>,
    sessions: HashMap<String, StoredSession>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// In-memory user and history store; contents are lost on exit
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn create_session(&self, user_id: UserId, name: Option<&str>) -> Result<ChatSession> {
        let mut inner = self.inner.write().await;
        if !inner.users.iter().any(|u| u.user.id == user_id) {
            return Err(Error::InvalidInput(format!("unknown user {}", user_id)));
        }

        let now = Utc::now();
        let session = ChatSession {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            session_name: name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_SESSION_NAME)
                .to_string(),
            created_at: now,
            updated_at: now,
        };

        let touched = inner.tick();
        inner.sessions.insert(
            session.session_id.clone(),
            StoredSession {
                session: session.clone(),
                turns: Vec::new(),
                touched,
            },
        );
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(session_id).map(|s| s.session.clone()))
    }

    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
        let mut inner = self.inner.write().await;
        let touched = inner.tick();
        let stored = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        stored.session.updated_at = Utc::now();
        stored.touched = touched;
        stored.turns.push(ChatTurn {
            session_id: session_id.to_string(),
            ..turn
        });
        Ok(())
    }

    async fn list(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default())
    }

    async fn recent(&self, session_id: &str, n: usize) -> Result<Vec<ChatTurn>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(session_id)
            .map(|s| {
                let skip = s.turns.len().saturating_sub(n);
                s.turns[skip..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<&StoredSession> = inner
            .sessions
            .values()
            .filter(|s| s.session.user_id == user_id)
            .collect();
        sessions.sort_by(|a, b| {
            b.session
                .updated_at
                .cmp(&a.session.updated_at)
                .then(b.touched.cmp(&a.touched))
        });
        Ok(sessions.into_iter().map(|s| s.session.clone()).collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let password_hash = hash_password(&new_user.password);
        let mut inner = self.inner.write().await;

        let duplicate = inner
            .users
            .iter()
            .any(|u| u.user.username == new_user.username || u.user.email == new_user.email);
        if duplicate {
            return Err(Error::Conflict("Username or email already exists".to_string()));
        }

        let user = User {
            id: inner.users.len() as UserId + 1,
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            phone_number: new_user.phone_number,
            profile: UserProfile::default(),
        };
        inner.users.push(StoredUser {
            user: user.clone(),
            password_hash,
        });
        Ok(user)
    }

    async fn verify_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.user.username == username)
            .filter(|u| verify_password(password, &u.password_hash))
            .map(|u| u.user.clone()))
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.user.clone()))
    }

    async fn update_profile(&self, user_id: UserId, profile: UserProfile) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown user {}", user_id)))?;
        stored.user.profile = profile;
        Ok(())
    }
}
