//! Observability for edge metadata services.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `RequestMetrics` - Per-request timing summary
//! - `FailureReporter` - Sink for unhandled request errors

mod failure;
mod logging;
mod metrics;

pub use failure::*;
pub use logging::*;
pub use metrics::*;

// Re-export RequestId and TimingContext from edge-core for convenience
pub use edge_core::{RequestId, TimingContext};
