//! HTTP API for the career guide service
//!
//! JSON endpoints for signup/login, chat, history, sessions and profiles,
//! served with axum. Authentication is a bearer token issued at login.

mod auth;
mod chat;
mod config;
mod error;
mod routes;
mod state;
mod suggestions;

#[cfg(test)]
mod tests;

use std::future::Future;
use tokio::net::TcpListener;

pub use auth::{AuthSession, TokenRegistry, bearer_token};
pub use chat::{ChatReply, ChatRequest};
pub use config::{DEFAULT_BIND_ADDRESS, ServerConfig};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use suggestions::SUGGESTED_QUESTIONS;

pub use cg_core::{Error, Result};

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "career guide API listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
