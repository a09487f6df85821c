// Error types for gemcache
// Author: kelexine (https://github.com/kelexine)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Remote cache service unavailable: HTTP {status}: {message}")]
    RemoteUnavailable { status: u16, message: String },

    #[error("Invalid response from remote cache service: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Build a `RemoteUnavailable` error from a status code and body text.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        CacheError::RemoteUnavailable {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with this error, if it came from the remote service.
    pub fn status(&self) -> Option<u16> {
        match self {
            CacheError::RemoteUnavailable { status, .. } => Some(*status),
            CacheError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failing remote call is worth repeating.
    ///
    /// Transport errors only qualify when the connection could not be
    /// established, since the server never saw the request.
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Http(e) if e.is_connect() => true,
            _ => self
                .status()
                .map(crate::utils::retry::is_retryable)
                .unwrap_or(false),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
