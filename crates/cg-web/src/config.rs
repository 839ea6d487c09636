//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;

use cg_core::{Error, Result};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            bind_address: lookup("BIND_ADDRESS")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        }
    }

    /// Override the bind address, e.g. from a command-line flag
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.trim().parse().map_err(|e| {
            Error::InvalidInput(format!("invalid bind address '{}': {}", self.bind_address, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_address() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.socket_addr().unwrap().port(), 5000);
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = ServerConfig::default().with_bind_address("localhost:http");
        assert!(matches!(config.socket_addr(), Err(Error::InvalidInput(_))));
    }
}
