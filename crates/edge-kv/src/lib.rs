//! Key-value namespace access with cursor pagination.
//!
//! Provides a read-only [`KvNamespace`] abstraction over a key-value store,
//! a lazy key enumerator that follows list cursors to the end, and backends
//! for Spin's key-value store and for in-memory development data.
//!
//! # Example
//!
//! ```rust,ignore
//! use edge_kv::{collect_keys, InMemoryNamespace, KvNamespace, ListOptions};
//!
//! let versions = InMemoryNamespace::new("CDNJS_VERSIONS");
//! versions.put("jquery/3.7.1", r#"{"version":"3.7.1"}"#);
//!
//! // Every key under a prefix, however many pages that takes
//! let keys = collect_keys(&versions, ListOptions::new().with_prefix("jquery/")).await?;
//!
//! // A single value
//! let doc = versions.get("jquery/3.7.1").await?;
//! ```

mod enumerate;
mod error;
mod memory;
mod namespace;
#[cfg(target_arch = "wasm32")]
mod spin;

pub use enumerate::{collect_keys, enumerate_keys};
pub use error::KvError;
pub use memory::InMemoryNamespace;
pub use namespace::{
    decode_cursor, encode_cursor, paginate, KeyRecord, KvNamespace, ListOptions, ListPage,
    DEFAULT_PAGE_SIZE,
};
#[cfg(target_arch = "wasm32")]
pub use spin::SpinNamespace;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{collect_keys, enumerate_keys, KeyRecord, KvError, KvNamespace, ListOptions};
}
