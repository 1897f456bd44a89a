//! Failure reporting.
//!
//! Every request that ends in a 500 produces exactly one [`FailureEvent`],
//! handed to a [`FailureReporter`] before the response goes out.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::{LogCapture, LogFormat, StructuredLogger};
use edge_core::{Environment, RequestId};

/// An unhandled error caught at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEvent {
    /// Request ID for correlation.
    pub request_id: String,
    /// Deployment environment.
    pub environment: Environment,
    /// Endpoint being served, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Request path as received.
    pub path: String,
    /// Top-level error message.
    pub message: String,
    /// Full error chain.
    pub detail: String,
}

/// Receives failures caught by the request handler.
pub trait FailureReporter: Send + Sync {
    fn report(&self, event: &FailureEvent);
}

/// Reports failures as error-level structured log lines.
///
/// When a DSN is configured it is attached to each line so a log
/// forwarder can route the event to the matching error tracker project.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    dsn: Option<String>,
    format: LogFormat,
    capture: Option<LogCapture>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a destination DSN.
    pub fn with_dsn(mut self, dsn: Option<String>) -> Self {
        self.dsn = dsn;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Also keep reported lines in `capture`.
    pub fn with_capture(mut self, capture: LogCapture) -> Self {
        self.capture = Some(capture);
        self
    }
}

impl FailureReporter for LogReporter {
    fn report(&self, event: &FailureEvent) {
        let mut logger = StructuredLogger::new(RequestId::from_string(event.request_id.clone()))
            .with_service("failure-reporter")
            .with_format(self.format);
        if let Some(route) = &event.route {
            logger.set_route(route.clone());
        }
        if let Some(capture) = &self.capture {
            logger = logger.with_capture(capture.clone());
        }

        let mut line = logger
            .error_builder("unhandled error")
            .field("environment", event.environment.as_str())
            .field("path", event.path.clone())
            .field("error", event.message.clone())
            .field("detail", event.detail.clone());
        if let Some(dsn) = &self.dsn {
            line = line.field("dsn", dsn.clone());
        }
        line.emit();
    }
}

/// Keeps every reported event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<FailureEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of reported events.
    pub fn events(&self) -> Vec<FailureEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of reported events.
    pub fn count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, event: &FailureEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
