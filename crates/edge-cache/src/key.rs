//! Cache key composition.

use edge_core::Method;
use http::Uri;
use serde::{Deserialize, Serialize};

/// A cache key uniquely identifying a cached response.
///
/// Keys are built from the request method and the full request URL,
/// query string included, so two URLs differing only in their query are
/// distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// The computed key string.
    key: String,
    /// Components that make up the key (for debugging).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            components: Vec::new(),
        }
    }

    /// Key for a request.
    pub fn for_request(method: Method, url: &str) -> Self {
        let url = normalize_url(url);
        Self {
            key: format!("{} {}", method, url),
            components: vec![format!("method:{}", method), format!("url:{}", url)],
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the key components (for debugging).
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Lowercase scheme and host; path and query are kept byte for byte.
fn normalize_url(url: &str) -> String {
    let Ok(uri) = url.parse::<Uri>() else {
        return url.to_string();
    };
    let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
        return url.to_string();
    };

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let path_and_query = if path_and_query.is_empty() {
        "/"
    } else {
        path_and_query
    };

    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.as_str().to_ascii_lowercase(),
        path_and_query
    )
}
