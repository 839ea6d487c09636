//! SQLite-backed user and history store
//!
//! Uses an r2d2 connection pool; every query runs on the blocking thread
//! pool so request handlers never block the runtime.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use cg_core::{
    ChatSession, ChatTurn, DEFAULT_SESSION_NAME, Error, HistoryStore, NewUser, Result, Role, User,
    UserId, UserProfile, UserStore,
};

use crate::password::{hash_password, verify_password};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    full_name TEXT NOT NULL DEFAULT '',
    phone_number TEXT,
    educational_background TEXT NOT NULL DEFAULT '',
    interests TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    session_id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id),
    session_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES chat_sessions (session_id),
    role TEXT NOT NULL,
    message_text TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_sessions_user
    ON chat_sessions (user_id, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_chat_messages_session
    ON chat_messages (session_id, id);
";

const USER_COLUMNS: &str =
    "id, username, email, full_name, phone_number, educational_background, interests";

fn store_error(action: &str, e: impl Display) -> Error {
    Error::StoreUnavailable(format!("{}: {}", action, e))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("invalid timestamp '{}': {}", value, e)))
}

/// Raw user row from the database
struct UserRow {
    id: i64,
    username: String,
    email: String,
    full_name: String,
    phone_number: Option<String>,
    educational_background: String,
    interests: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            full_name: row.get(3)?,
            phone_number: row.get(4)?,
            educational_background: row.get(5)?,
            interests: row.get(6)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let interests: BTreeSet<String> = serde_json::from_str(&self.interests)?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            phone_number: self.phone_number,
            profile: UserProfile {
                educational_background: self.educational_background,
                interests,
            },
        })
    }
}

/// Raw session row from the database
struct SessionRow {
    session_id: String,
    user_id: i64,
    session_name: String,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            user_id: row.get(1)?,
            session_name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_session(self) -> Result<ChatSession> {
        Ok(ChatSession {
            session_id: self.session_id,
            user_id: self.user_id,
            session_name: self.session_name,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

/// Durable store for users, sessions and chat turns
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<DbPool>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (and migrate) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| store_error("Failed to create database directory", e))?;
        }

        // Pool construction retries until its timeout; fail fast on bad paths
        let mut first =
            Connection::open(path).map_err(|e| store_error("Failed to open database", e))?;
        Self::configure(&mut first).map_err(|e| store_error("Failed to configure database", e))?;
        Self::migrate(&first)?;
        drop(first);

        let manager = SqliteConnectionManager::file(path).with_init(Self::configure);
        let pool = Pool::builder()
            .max_size(8)
            .connection_timeout(Duration::from_secs(10))
            .build(manager)
            .map_err(|e| store_error("Failed to create connection pool", e))?;

        let store = Self {
            pool: Arc::new(pool),
            path: Some(path.to_path_buf()),
        };

        tracing::info!(path = %path.display(), "sqlite store opened");
        Ok(store)
    }

    /// Create an in-memory database with the same schema
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(Self::configure);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| store_error("Failed to create connection pool", e))?;

        let store = Self {
            pool: Arc::new(pool),
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure(conn: &mut Connection) -> rusqlite::Result<()> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| store_error("Failed to get connection", e))?;
        Self::migrate(&conn)
    }

    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| store_error("Failed to migrate schema", e))
    }

    /// Run a database task on the blocking pool
    async fn run<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| store_error("Failed to get connection", e))?;
            task(&mut *conn)
        })
        .await
        .map_err(|e| Error::Other(format!("Store task join error: {}", e)))?
    }

    fn find_user(
        conn: &Connection,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<(UserRow, String)>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE {} = ?1",
            USER_COLUMNS, column
        );
        conn.query_row(&sql, [value], |row| {
            Ok((UserRow::from_row(row)?, row.get::<_, String>(7)?))
        })
        .optional()
        .map_err(|e| store_error("Failed to load user", e))
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn create_session(&self, user_id: UserId, name: Option<&str>) -> Result<ChatSession> {
        let session_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_SESSION_NAME)
            .to_string();

        self.run(move |conn| {
            let now = Utc::now();
            let session = ChatSession {
                session_id: Uuid::new_v4().to_string(),
                user_id,
                session_name,
                created_at: now,
                updated_at: now,
            };

            conn.execute(
                "INSERT INTO chat_sessions (session_id, user_id, session_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![session.session_id, user_id, session.session_name, format_time(now)],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::InvalidInput(format!("unknown user {}", user_id))
                } else {
                    store_error("Failed to create session", e)
                }
            })?;

            Ok(session)
        })
        .await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<ChatSession>> {
        let session_id = session_id.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT session_id, user_id, session_name, created_at, updated_at
                 FROM chat_sessions WHERE session_id = ?1",
                params![session_id],
                SessionRow::from_row,
            )
            .optional()
            .map_err(|e| store_error("Failed to load session", e))?
            .map(SessionRow::into_session)
            .transpose()
        })
        .await
    }

    async fn append(&self, session_id: &str, turn: ChatTurn) -> Result<()> {
        let session_id = session_id.to_string();
        self.run(move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| store_error("Failed to begin transaction", e))?;

            let updated = tx
                .execute(
                    "UPDATE chat_sessions SET updated_at = ?1 WHERE session_id = ?2",
                    params![format_time(Utc::now()), session_id],
                )
                .map_err(|e| store_error("Failed to touch session", e))?;
            if updated == 0 {
                return Err(Error::SessionNotFound(session_id));
            }

            tx.execute(
                "INSERT INTO chat_messages (session_id, role, message_text, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![session_id, turn.role.as_str(), turn.text, format_time(turn.timestamp)],
            )
            .map_err(|e| store_error("Failed to save message", e))?;

            tx.commit()
                .map_err(|e| store_error("Failed to commit message", e))
        })
        .await
    }

    async fn list(&self, session_id: &str) -> Result<Vec<ChatTurn>> {
        let session_id = session_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT role, message_text, timestamp FROM chat_messages
                     WHERE session_id = ?1 ORDER BY id ASC",
                )
                .map_err(|e| store_error("Failed to prepare history query", e))?;

            let rows = stmt
                .query_map(params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| store_error("Failed to load history", e))?;

            let mut turns = Vec::new();
            for row in rows {
                let (role, text, timestamp) =
                    row.map_err(|e| store_error("Failed to read message", e))?;
                let role = Role::parse(&role)
                    .ok_or_else(|| Error::Serialization(format!("unknown role '{}'", role)))?;
                turns.push(ChatTurn {
                    session_id: session_id.clone(),
                    role,
                    text,
                    timestamp: parse_time(&timestamp)?,
                });
            }
            Ok(turns)
        })
        .await
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<ChatSession>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, user_id, session_name, created_at, updated_at
                     FROM chat_sessions WHERE user_id = ?1
                     ORDER BY updated_at DESC, rowid DESC",
                )
                .map_err(|e| store_error("Failed to prepare sessions query", e))?;

            let rows = stmt
                .query_map(params![user_id], SessionRow::from_row)
                .map_err(|e| store_error("Failed to load sessions", e))?;

            rows.map(|row| {
                row.map_err(|e| store_error("Failed to read session", e))?
                    .into_session()
            })
            .collect()
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let password_hash = hash_password(&new_user.password);

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, full_name, phone_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new_user.username,
                    new_user.email,
                    password_hash,
                    new_user.full_name,
                    new_user.phone_number,
                    format_time(Utc::now()),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::Conflict("Username or email already exists".to_string())
                } else {
                    store_error("Failed to create user", e)
                }
            })?;

            let id = conn.last_insert_rowid();
            tracing::info!(user_id = id, username = %new_user.username, "user registered");

            Ok(User {
                id,
                username: new_user.username,
                email: new_user.email,
                full_name: new_user.full_name,
                phone_number: new_user.phone_number,
                profile: UserProfile::default(),
            })
        })
        .await
    }

    async fn verify_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let username = username.to_string();
        let password = password.to_string();

        self.run(move |conn| match Self::find_user(conn, "username", &username)? {
            Some((row, stored)) if verify_password(&password, &stored) => row.into_user().map(Some),
            _ => Ok(None),
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        self.run(move |conn| {
            Self::find_user(conn, "id", &user_id)?
                .map(|(row, _)| row.into_user())
                .transpose()
        })
        .await
    }

    async fn update_profile(&self, user_id: UserId, profile: UserProfile) -> Result<()> {
        let interests = serde_json::to_string(&profile.interests)?;

        self.run(move |conn| {
            let updated = conn
                .execute(
                    "UPDATE users SET educational_background = ?1, interests = ?2 WHERE id = ?3",
                    params![profile.educational_background, interests, user_id],
                )
                .map_err(|e| store_error("Failed to update profile", e))?;

            if updated == 0 {
                return Err(Error::InvalidInput(format!("unknown user {}", user_id)));
            }
            Ok(())
        })
        .await
    }
}
