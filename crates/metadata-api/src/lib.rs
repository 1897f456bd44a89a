//! Read-only package metadata API.
//!
//! This crate provides:
//! - `Router` - Ordered, anchored path patterns resolving to a `Route`
//! - `MetadataStore` - Typed reads over the package, version, SRI and
//!   aggregated namespaces
//! - `RequestHandler` - Decodes, routes, caches and answers requests
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use metadata_api::prelude::*;
//!
//! let store = MetadataStore::new(packages, versions, sris, aggregated);
//! let cache = ResponseCache::new(Arc::new(InMemoryResponseStore::new()), tasks.clone());
//! let handler = RequestHandler::new(store, cache, Arc::new(LogReporter::new()), config);
//!
//! let ctx = RequestContext::new(Method::Get, "https://metadata.example.com/packages/jquery")?;
//! let response = handler.handle(&ctx).await;
//! ```

mod error;
mod extensions;
mod handler;
mod response;
mod router;
mod store;
mod uri;

pub use error::ApiError;
pub use extensions::ALLOWED_EXTENSIONS;
pub use handler::{LogSettings, RequestHandler, SERVICE_NAME};
pub use response::{FAILURE_MESSAGE, FAVICON_MESSAGE, FORBIDDEN_MESSAGE, NOT_FOUND_MESSAGE};
pub use router::{
    Endpoint, Route, RouteSpec, Router, AGGREGATED_TTL_SECS, IMMUTABLE_TTL_SECS,
    LISTING_TTL_SECS, ROUTE_TABLE,
};
pub use store::{version_key, MetadataStore};
pub use uri::decode_uri;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{MetadataStore, RequestHandler, Route, Router};
    pub use edge_cache::{DeferredTasks, InMemoryResponseStore, ResponseCache};
    pub use edge_core::{Method, RequestContext, Response, ServiceConfig};
    pub use edge_observability::{FailureReporter, LogReporter};
}
