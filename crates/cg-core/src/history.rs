//! Chat history and user store traits and types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::Result;

/// Numeric user identifier assigned by the user store
pub type UserId = i64;

/// Name given to sessions created without an explicit one
pub const DEFAULT_SESSION_NAME: &str = "Career Counseling Session";

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse from the stored string form
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question or answer in a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub session_id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Create a turn stamped with the current time
    pub fn new(session_id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An ordered conversation owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub user_id: UserId,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional context injected into prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub educational_background: String,
    pub interests: BTreeSet<String>,
}

impl UserProfile {
    pub fn new<I, S>(educational_background: impl Into<String>, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            educational_background: educational_background.into(),
            interests: interests.into_iter().map(Into::into).collect(),
        }
    }

    /// True when there is nothing worth putting in a prompt
    pub fn is_empty(&self) -> bool {
        self.educational_background.trim().is_empty()
            && self.interests.iter().all(|i| i.trim().is_empty())
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub profile: UserProfile,
}

impl User {
    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Trait for the per-session chat log
///
/// Turns are append-only. Every turn belongs to exactly one session and
/// every session to exactly one user.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Start a new session for `user_id`
    async fn create_session(&self, user_id: UserId, name: Option<&str>) -> Result<ChatSession>;

    async fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>>;

    /// Append a turn under `session_id`, whatever `turn.session_id` says
    ///
    /// Fails with `SessionNotFound` for an unknown session.
    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()>;

    /// All turns of a session in insertion order
    async fn list(&self, session_id: &str) -> Result<Vec<ChatTurn>>;

    /// The last `n` turns of a session, oldest first
    async fn recent(&self, session_id: &str, n: usize) -> Result<Vec<ChatTurn>> {
        let mut turns = self.list(session_id).await?;
        let skip = turns.len().saturating_sub(n);
        Ok(turns.split_off(skip))
    }

    /// Sessions of a user, most recently updated first
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>>;

    /// Backend name reported by health checks
    fn backend_name(&self) -> &'static str;
}

/// Trait for user accounts and profiles
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register a user; fails with `Conflict` on duplicate username or email
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Return the user when the password matches
    async fn verify_user(&self, username: &str, password: &str) -> Result<Option<User>>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    async fn update_profile(&self, user_id: UserId, profile: UserProfile) -> Result<()>;
}
