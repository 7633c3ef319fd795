//! Backend HTTP client error types.

use crate::config::ConfigError;

/// Errors from backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The backend rejected the credentials (401) or the permission (403).
    /// The navigator has already been sent to the login surface.
    #[error("{endpoint} rejected the request with {status}")]
    Unauthorized { endpoint: String, status: u16 },
    /// Any other non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Request body serialization failed.
    #[error("failed to serialize request body: {0}")]
    Encode(#[from] serde_json::Error),
    /// The request target could not be turned into a URL.
    #[error("invalid request target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status carried by the error, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Http { source, .. } | Self::Deserialization { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
