//! Shared reqwest plumbing for the remote providers

use reqwest::{Client, Response};
use std::time::Duration;

use cg_core::{Error, Result};

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

pub(crate) fn map_send_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{} request timed out", provider))
    } else {
        Error::Network(format!("{} request failed: {}", provider, err))
    }
}

/// Turn a non-success status into `ProviderUnavailable` with the body text
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(Error::ProviderUnavailable(format!(
        "{} API request failed with status {}: {}",
        provider, status, error_text
    )))
}
