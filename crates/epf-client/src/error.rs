//! Error types for the EPF session client
//!
//! Each protocol step has its own variant so the orchestrator can tell a
//! rejected login from an unreachable service without string matching.

use thiserror::Error;

/// Result type alias for EPF operations
pub type Result<T> = std::result::Result<T, EpfError>;

#[derive(Error, Debug)]
pub enum EpfError {
    /// Missing or invalid client configuration (e.g. save location)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Error logging in: {0}")]
    Authentication(String),

    #[error("Error logging out: {0}")]
    Logout(String),

    #[error("Error getting file list: {0}")]
    List(String),

    #[error("Error downloading file: {0}")]
    Download(String),

    #[error("Error setting status: {0}")]
    StatusUpdate(String),

    /// Protected endpoint called before a successful login or after logout
    #[error("Not authenticated: {endpoint} requires an active session")]
    NotAuthenticated { endpoint: &'static str },

    /// Connection-level failure from the HTTP layer
    #[error("Transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The per-call timeout elapsed before the exchange completed
    #[error("Request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: &'static str, secs: u64 },

    /// The service answered "success" but the payload was not usable
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse {
        endpoint: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EpfError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_response(endpoint: &'static str, msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint,
            message: msg.into(),
        }
    }

    /// Wrap a reqwest failure, separating timeouts from other transport errors
    pub(crate) fn from_transport(endpoint: &'static str, secs: u64, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { endpoint, secs }
        } else {
            Self::Transport { endpoint, source }
        }
    }

    /// True when the service could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}
