//! Per-response cache policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long a response may live in the cache.
///
/// An enabled policy renders as `Cache-Control: max-age=<seconds>` on the
/// response and stores it in the response cache for the same duration. A
/// disabled policy adds no header and stores nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteCachePolicy {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Time-to-live for cached responses.
    pub ttl: Duration,
}

impl RouteCachePolicy {
    /// Create a new cache policy with no caching.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cache for `ttl`.
    pub fn max_age(ttl: Duration) -> Self {
        Self { enabled: true, ttl }
    }

    /// Cache for `secs` seconds.
    pub fn max_age_secs(secs: u64) -> Self {
        Self::max_age(Duration::from_secs(secs))
    }

    /// Check if responses under this policy are stored.
    pub fn is_cacheable(&self) -> bool {
        self.enabled
    }

    /// TTL in whole seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Value for the `Cache-Control` header, if any.
    pub fn cache_control_header(&self) -> Option<String> {
        self.enabled.then(|| format!("max-age={}", self.ttl.as_secs()))
    }
}
