//! Document access errors.

use crewdesk_core::ValidationError;

/// Errors from document store operations.
///
/// A missing document on read is not an error: `get_one` returns `None`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A partial update targeted a document that does not exist.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The constraint list cannot be evaluated.
    #[error("invalid query on {collection}: {reason}")]
    InvalidQuery { collection: String, reason: String },

    /// The pagination cursor is malformed or belongs to another ordering.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// The batch was rejected as a whole.
    #[error("batch rejected: {0}")]
    BatchRejected(String),

    /// Entity (de)serialization failed.
    #[error("failed to map document in {collection}: {source}")]
    Serialization {
        collection: String,
        source: serde_json::Error,
    },

    /// An entity did not serialize to a JSON object.
    #[error("entities stored in {collection} must serialize to a JSON object")]
    NotAnObject { collection: String },

    /// The backend could not be reached.
    #[error("document store unavailable: {reason}")]
    Unavailable { reason: String },

    /// An identifier was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
