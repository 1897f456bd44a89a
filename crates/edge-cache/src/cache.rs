//! Shared response cache keyed by request.

use std::sync::Arc;

use edge_core::Response;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::{
    BackgroundTasks, CacheKey, CachedResponse, Clock, ResponseStore, RouteCachePolicy, SystemClock,
};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to serialize/deserialize cache entry.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Not in the cache; built fresh.
    Miss,
    /// The cache was not consulted.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// Called when a detached cache write fails.
pub type StoreErrorHook = Arc<dyn Fn(&CacheKey, &CacheError) + Send + Sync>;

/// Response cache over a [`ResponseStore`].
///
/// Lookups are awaited. Writes are handed to [`BackgroundTasks`] and never
/// delay the caller; a failed write is passed to the error hook and
/// otherwise dropped.
pub struct ResponseCache {
    store: Arc<dyn ResponseStore>,
    tasks: Arc<dyn BackgroundTasks>,
    clock: Arc<dyn Clock>,
    on_store_error: Option<StoreErrorHook>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn ResponseStore>, tasks: Arc<dyn BackgroundTasks>) -> Self {
        Self {
            store,
            tasks,
            clock: Arc::new(SystemClock),
            on_store_error: None,
        }
    }

    /// Stamp entries with `clock` instead of wall-clock time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Observe failed background writes.
    pub fn on_store_error(mut self, hook: StoreErrorHook) -> Self {
        self.on_store_error = Some(hook);
        self
    }

    /// Find a live response for `key`.
    pub async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<Response>> {
        match self.store.get(key).await? {
            Some(entry) => entry.into_response().map(Some),
            None => Ok(None),
        }
    }

    /// Apply `policy` to `response` and schedule the cache write.
    ///
    /// Appends `Cache-Control: max-age=<ttl>` and stores an exact copy of
    /// the resulting response. A disabled policy leaves the response as is
    /// and stores nothing.
    pub fn store(&self, key: &CacheKey, mut response: Response, policy: &RouteCachePolicy) -> Response {
        let Some(cache_control) = policy.cache_control_header() else {
            return response;
        };
        response.append_header(http::header::CACHE_CONTROL.as_str(), cache_control);

        let entry = CachedResponse::capture(&response, self.clock.now(), policy.ttl);
        let store = self.store.clone();
        let hook = self.on_store_error.clone();
        let key = key.clone();
        self.tasks.spawn(
            async move {
                if let Err(e) = store.put(&key, entry).await {
                    if let Some(hook) = hook {
                        hook(&key, &e);
                    }
                }
            }
            .boxed(),
        );

        response
    }
}
