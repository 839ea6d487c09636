//! Route table and handlers

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use cg_core::{ChatSession, Error, NewUser, Role, User, UserId, UserProfile};

use crate::auth::{AuthSession, bearer_token};
use crate::chat::{ChatReply, ChatRequest, handle_chat, owned_session};
use crate::error::ApiError;
use crate::state::AppState;
use crate::suggestions::SUGGESTED_QUESTIONS;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/chat", post(chat))
        .route("/api/history", get(history))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/suggested-questions", get(suggested_questions))
        .route("/api/user-profile", get(user_profile))
        .route("/api/update-profile", post(update_profile))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: UserId,
    username: String,
    full_name: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NewSessionRequest {
    #[serde(default)]
    session_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    session_id: String,
    session_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChatSession> for SessionSummary {
    fn from(session: ChatSession) -> Self {
        Self {
            session_id: session.session_id,
            session_name: session.session_name,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    #[serde(rename = "type")]
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    username: String,
    full_name: String,
    educational_background: String,
    interests: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdate {
    #[serde(default)]
    educational_background: String,
    #[serde(default)]
    interests: Vec<String>,
}

impl From<ProfileUpdate> for UserProfile {
    fn from(update: ProfileUpdate) -> Self {
        UserProfile::new(
            update.educational_background.trim(),
            update
                .interests
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty()),
        )
    }
}

/// Resolve the caller's token, if any
async fn current_user(state: &AppState, headers: &HeaderMap) -> Option<(String, AuthSession)> {
    let token = bearer_token(headers)?;
    let session = state.auth.lookup(token).await?;
    Some((token.to_string(), session))
}

async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, AuthSession), ApiError> {
    current_user(state, headers)
        .await
        .ok_or_else(ApiError::unauthenticated)
}

/// Parse a JSON body whatever its content type; a blank body reads as `{}`
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body[..]
    };
    serde_json::from_slice(raw)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

async fn issue_token(state: &AppState, user: &User, session_id: String) -> AuthResponse {
    let token = state
        .auth
        .issue(AuthSession {
            user_id: user.id,
            username: user.username.clone(),
            active_session: session_id.clone(),
        })
        .await;

    AuthResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
        full_name: user.display_name().to_string(),
        session_id,
    }
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let stats = state.engine.stats();
    Json(json!({
        "status": "ok",
        "store": state.history.backend_name(),
        "generator": stats.generator,
        "embedder": stats.embedder,
        "indexed_chunks": stats.indexed_chunks,
        "top_k": stats.top_k,
        "index": state.index_status,
    }))
}

async fn signup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    let request: SignupRequest = parse_body(&body)?;
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username, email and password are required"));
    }

    let user = state
        .users
        .create_user(NewUser {
            username,
            email,
            password: request.password,
            full_name: request.full_name.trim().to_string(),
            phone_number: request.phone_number.filter(|p| !p.trim().is_empty()),
        })
        .await?;

    let session = state.history.create_session(user.id, None).await?;
    tracing::info!(user_id = user.id, session_id = %session.session_id, "signed up");

    Ok(Json(issue_token(&state, &user, session.session_id).await))
}

async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let user = state
        .users
        .verify_user(request.username.trim(), &request.password)
        .await?
        .ok_or_else(|| Error::Authentication("Invalid username or password".to_string()))?;

    let session_id = match state.history.list_sessions(user.id).await?.into_iter().next() {
        Some(latest) => latest.session_id,
        None => state.history.create_session(user.id, None).await?.session_id,
    };

    Ok(Json(issue_token(&state, &user, session_id).await))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.auth.revoke(token).await;
    }
    Json(json!({ "success": true }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatReply>, ApiError> {
    let (token, user) = require_user(&state, &headers).await?;
    let request: ChatRequest = parse_body(&body)?;
    handle_chat(&state, &token, &user, request).await.map(Json)
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Some((_, user)) = current_user(&state, &headers).await else {
        return Ok(Json(Vec::new()));
    };

    let session_id = query
        .session_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| user.active_session.clone());
    let session = owned_session(&state, &user, &session_id).await?;

    let turns = state.history.list(&session.session_id).await?;
    Ok(Json(
        turns
            .into_iter()
            .map(|turn| HistoryEntry {
                role: turn.role,
                text: turn.text,
                timestamp: turn.timestamp,
            })
            .collect(),
    ))
}

async fn list_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let Some((_, user)) = current_user(&state, &headers).await else {
        return Ok(Json(Vec::new()));
    };

    let sessions = state.history.list_sessions(user.user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionSummary::from).collect()))
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SessionSummary>, ApiError> {
    let (token, user) = require_user(&state, &headers).await?;
    let request: NewSessionRequest = parse_body(&body)?;

    let session = state
        .history
        .create_session(user.user_id, request.session_name.as_deref())
        .await?;
    state.auth.set_active_session(&token, &session.session_id).await;

    Ok(Json(session.into()))
}

async fn suggested_questions() -> Json<[&'static str; 4]> {
    Json(SUGGESTED_QUESTIONS)
}

async fn user_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (_, session) = require_user(&state, &headers).await?;
    let user = state
        .users
        .get_user(session.user_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    Ok(Json(ProfileResponse {
        username: user.username.clone(),
        full_name: user.display_name().to_string(),
        educational_background: user.profile.educational_background,
        interests: user.profile.interests.into_iter().collect(),
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let (_, session) = require_user(&state, &headers).await?;
    let update: ProfileUpdate = parse_body(&body)?;
    state
        .users
        .update_profile(session.user_id, update.into())
        .await?;
    Ok(Json(json!({ "success": true })))
}
