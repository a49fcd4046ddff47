//! Error types for Abacus.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Abacus operations.
///
/// The first three variants are the relay's contract: every failed solve
/// ends in exactly one of them. The rest come from loading configuration.
#[derive(Error, Debug)]
pub enum AbacusError {
    /// Invalid or missing user-supplied option. Fixed by correcting input.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or rejected credential.
    #[error("Request error: {0}")]
    Request(String),

    /// The remote model or a knowledge tool failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamFailure),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl AbacusError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AbacusError::Configuration(_) => "configuration",
            AbacusError::Request(_) => "request",
            AbacusError::Upstream(_) => "upstream",
            AbacusError::Io(_) | AbacusError::Json(_) | AbacusError::TomlParse(_) => "internal",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, AbacusError::Configuration(_))
    }

    pub fn is_request(&self) -> bool {
        matches!(self, AbacusError::Request(_))
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, AbacusError::Upstream(_))
    }
}

/// What went wrong talking to a remote service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamFailure {
    #[error("request to {service} timed out after {}s", .after.as_secs_f64())]
    Timeout { service: String, after: Duration },

    #[error("{service} returned {status}: {message}")]
    Status {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} failed: {message}")]
    Transport { service: String, message: String },

    #[error("{service} returned an empty response")]
    Empty { service: String },
}

impl UpstreamFailure {
    /// Classify a `reqwest` error from a call to `service`.
    pub fn from_reqwest(service: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            UpstreamFailure::Timeout {
                service: service.to_string(),
                after: timeout,
            }
        } else if let Some(status) = err.status() {
            UpstreamFailure::Status {
                service: service.to_string(),
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            UpstreamFailure::Transport {
                service: service.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamFailure::Timeout { .. })
    }
}

/// Result type alias for Abacus operations.
pub type Result<T> = std::result::Result<T, AbacusError>;
