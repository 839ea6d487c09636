//! Error types for the career guide service

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the career guide service
#[derive(Error, Debug)]
pub enum Error {
    /// A provider credential or required setting is absent.
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// An embedding or generation call failed (network, quota, bad response).
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No persisted index at {0}")]
    IndexMissing(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Whether the orchestrator answers this failure with a static message
    /// instead of surfacing it.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::ConfigMissing(_)
                | Error::ProviderUnavailable(_)
                | Error::Network(_)
                | Error::Timeout(_)
                | Error::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
