//! Cache debugging headers.

use edge_core::RequestContext;
use serde::{Deserialize, Serialize};

use crate::{CacheKey, CacheStatus};

/// Header names for cache debugging.
pub mod header_names {
    /// Cache status header (HIT, MISS, BYPASS).
    pub const X_CACHE_STATUS: &str = "X-Cache-Status";
    /// Cache key used for lookup.
    pub const X_CACHE_KEY: &str = "X-Cache-Key";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "X-Request-ID";
    /// Request header asking for debug headers.
    pub const X_DEBUG_CACHE: &str = "X-Debug-Cache";
}

/// Cache explain headers for debugging.
///
/// Added to the outgoing response only, after any cache write, so they
/// never end up in a stored entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheExplainHeaders {
    /// Overall cache status.
    pub status: Option<CacheStatus>,
    /// Cache key used.
    pub cache_key: Option<String>,
}

impl CacheExplainHeaders {
    /// Create new explain headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache status.
    pub fn with_status(mut self, status: CacheStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set cache key.
    pub fn with_key(mut self, key: &CacheKey) -> Self {
        self.cache_key = Some(key.as_str().to_string());
        self
    }

    /// Convert to HTTP headers.
    pub fn to_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(status) = &self.status {
            headers.push((header_names::X_CACHE_STATUS.to_string(), status.to_string()));
        }

        if let Some(key) = &self.cache_key {
            headers.push((header_names::X_CACHE_KEY.to_string(), key.clone()));
        }

        headers
    }
}

/// Utility to check if debug headers should be included.
pub fn should_include_debug_headers(ctx: &RequestContext) -> bool {
    ctx.header(header_names::X_DEBUG_CACHE) == Some("1")
}

#[cfg(test)]
mod tests {
    use edge_core::Method;

    use super::*;

    #[test]
    fn test_explain_headers() {
        let key = CacheKey::for_request(Method::Get, "https://api.example.com/versions");
        let headers = CacheExplainHeaders::new()
            .with_status(CacheStatus::Hit)
            .with_key(&key)
            .to_headers();

        assert_eq!(
            headers,
            vec![
                ("X-Cache-Status".to_string(), "HIT".to_string()),
                (
                    "X-Cache-Key".to_string(),
                    "GET https://api.example.com/versions".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_empty_explain_headers() {
        assert!(CacheExplainHeaders::new().to_headers().is_empty());
    }

    #[test]
    fn test_debug_header_detection() {
        let ctx = RequestContext::new(Method::Get, "https://api.example.com/packages").unwrap();
        assert!(!should_include_debug_headers(&ctx));

        let ctx = ctx.with_header("X-Debug-Cache", "1");
        assert!(should_include_debug_headers(&ctx));

        let ctx = RequestContext::new(Method::Get, "https://api.example.com/packages")
            .unwrap()
            .with_header("x-debug-cache", "0");
        assert!(!should_include_debug_headers(&ctx));
    }
}
