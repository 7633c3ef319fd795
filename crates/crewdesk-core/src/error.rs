//! Validation errors for domain primitives.

use thiserror::Error;

/// A value was rejected by a validating constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Document identifiers must be non-empty and must not contain `/`.
    #[error("invalid document id {0:?}: must be non-empty and contain no '/'")]
    InvalidDocumentId(String),

    /// Provider-issued user ids must be non-empty.
    #[error("invalid auth uid {0:?}: must be non-empty")]
    InvalidAuthUid(String),
}
