//! The chat turn flow
//!
//! Validate, resolve the session, gather profile and recent history, ask
//! the engine, then record both turns. Failures to record turns are logged
//! and do not change the reply.

use serde::{Deserialize, Serialize};

use cg_core::{AnswerRequest, ChatSession, ChatTurn, Role};

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
}

/// Load a session and check that `user` owns it
pub(crate) async fn owned_session(
    state: &AppState,
    user: &AuthSession,
    session_id: &str,
) -> Result<ChatSession, ApiError> {
    match state.history.get_session(session_id).await? {
        Some(session) if session.user_id == user.user_id => Ok(session),
        _ => Err(ApiError::session_not_found()),
    }
}

/// Resolve the token's active session
///
/// The session was owned by the user when it became active, so a store
/// failure here is logged and the id used as is.
async fn active_session(state: &AppState, user: &AuthSession) -> Result<String, ApiError> {
    match state.history.get_session(&user.active_session).await {
        Ok(Some(session)) if session.user_id == user.user_id => Ok(session.session_id),
        Ok(_) => Err(ApiError::session_not_found()),
        Err(e) => {
            tracing::warn!(
                session_id = %user.active_session,
                error = %e,
                "failed to look up active session"
            );
            Ok(user.active_session.clone())
        }
    }
}

pub(crate) async fn handle_chat(
    state: &AppState,
    token: &str,
    user: &AuthSession,
    request: ChatRequest,
) -> Result<ChatReply, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is empty"));
    }

    let session_id = match request.session_id.as_deref().map(str::trim) {
        Some(requested) if !requested.is_empty() && requested != user.active_session => {
            let session = owned_session(state, user, requested).await?;
            state.auth.set_active_session(token, &session.session_id).await;
            session.session_id
        }
        _ => active_session(state, user).await?,
    };

    let profile = match state.users.get_user(user.user_id).await {
        Ok(found) => found.map(|u| u.profile).filter(|p| !p.is_empty()),
        Err(e) => {
            tracing::warn!(user_id = user.user_id, error = %e, "failed to load profile");
            None
        }
    };

    let history = match state.history.recent(&session_id, state.history_window).await {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "failed to load history");
            Vec::new()
        }
    };

    record(state, ChatTurn::new(&session_id, Role::User, message)).await;

    let mut answer_request = AnswerRequest::new(message, &session_id).with_history(history);
    if let Some(profile) = profile {
        answer_request = answer_request.with_profile(profile);
    }
    let answer = state.engine.answer(answer_request).await;

    record(state, ChatTurn::new(&session_id, Role::Assistant, &answer.response_text)).await;

    Ok(ChatReply {
        response: answer.response_text,
        session_id,
    })
}

async fn record(state: &AppState, turn: ChatTurn) {
    let session_id = turn.session_id.clone();
    if let Err(e) = state.history.append(&session_id, turn).await {
        tracing::error!(session_id = %session_id, error = %e, "failed to save message");
    }
}
