//! Core abstractions for edge metadata services.
//!
//! This crate provides the fundamental types:
//! - `RequestContext` - Parsed request identity (method, URL, headers)
//! - `ServiceConfig` - Environment, store bindings and serving knobs
//! - `RequestLifecycle` - Linear request state machine with timings
//! - `Response` - Status, ordered headers and body

mod config;
mod context;
mod lifecycle;
mod response;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use response::*;

pub use http::StatusCode;
