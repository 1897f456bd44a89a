//! Response caching for edge metadata services.
//!
//! This crate provides:
//! - `RouteCachePolicy` - Per-response TTL rendered as `Cache-Control: max-age`
//! - `CacheKey` - Keys built from request method and full URL
//! - `ResponseCache` - Lookup plus detached, log-and-drop writes
//! - `ResponseStore` - Storage backends (in-memory, Spin key-value)
//! - `BackgroundTasks` - Where detached writes run
//! - `CacheExplainHeaders` - Debug headers for cache behavior
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{CacheKey, DeferredTasks, InMemoryResponseStore, ResponseCache, RouteCachePolicy};
//!
//! let tasks = Arc::new(DeferredTasks::new());
//! let cache = ResponseCache::new(Arc::new(InMemoryResponseStore::new()), tasks.clone());
//!
//! let key = CacheKey::for_request(Method::Get, "https://api.example.com/packages");
//! let response = cache.store(&key, response, &RouteCachePolicy::max_age_secs(3600));
//! tasks.drain().await;
//! ```

mod cache;
mod entry;
mod headers;
mod key;
mod policy;
mod store;
mod tasks;

pub use cache::*;
pub use entry::*;
pub use headers::*;
pub use key::*;
pub use policy::*;
pub use store::*;
pub use tasks::*;
