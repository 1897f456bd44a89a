//! API error types.

use edge_cache::CacheError;
use edge_core::LifecycleError;
use edge_kv::KvError;
use thiserror::Error;

/// Failures that end a request with a 500.
///
/// Missing entities and unknown paths are ordinary responses, not errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A key-value get, list or page call failed.
    #[error("metadata store failure")]
    Store(#[from] KvError),

    /// The response cache could not be read.
    #[error("response cache failure")]
    Cache(#[from] CacheError),

    /// The request path is not valid percent-encoded UTF-8.
    #[error("malformed request path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    /// An SRI record carries no usable `sri` value.
    #[error("SRI record '{key}' has invalid metadata: {reason}")]
    InvalidMetadata { key: String, reason: String },

    /// A response body could not be produced.
    #[error("failed to build response: {0}")]
    Response(String),

    /// The request lifecycle was driven out of order.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
