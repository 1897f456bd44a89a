//! Key-value error types.

use thiserror::Error;

/// Errors that can occur when reading a key-value namespace.
#[derive(Error, Debug)]
pub enum KvError {
    /// Failed to open the namespace.
    #[error("failed to open namespace '{name}': {reason}")]
    Open { name: String, reason: String },

    /// A get or list call failed in the backing store.
    #[error("{operation} on namespace '{namespace}' failed: {reason}")]
    Store {
        namespace: String,
        operation: &'static str,
        reason: String,
    },

    /// The list cursor could not be decoded.
    #[error("invalid list cursor: {0}")]
    InvalidCursor(String),

    /// A page reported more keys but carried no cursor to fetch them.
    #[error("namespace '{0}' returned an incomplete page without a cursor")]
    MissingCursor(String),

    /// A stored value was not valid UTF-8 or JSON.
    #[error("value for key '{key}' is malformed: {reason}")]
    Malformed { key: String, reason: String },
}

impl KvError {
    /// Build a store failure for `operation` on `namespace`.
    pub fn store(
        namespace: impl Into<String>,
        operation: &'static str,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::Store {
            namespace: namespace.into(),
            operation,
            reason: reason.to_string(),
        }
    }
}
