//! Storage error types.

use thiserror::Error;

/// Errors raised by object and secret store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A payload could not be serialized or deserialized.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store reported a failure.
    #[error("storage backend: {0}")]
    Backend(String),
}
