//! Per-request timing metrics.

use std::time::Duration;

use edge_core::{RequestLifecycle, RequestPhase};
use serde::{Deserialize, Serialize};

use crate::StructuredLogger;

/// Metrics for a single request, logged once it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Endpoint the request resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// HTTP status code.
    pub status_code: u16,
    /// HIT, MISS or BYPASS.
    pub cache_status: String,
    /// Time spent in the cache lookup (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_lookup_us: Option<u64>,
    /// Time spent in store calls (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_us: Option<u64>,
    /// Total request duration (microseconds).
    pub total_duration_us: u64,
}

impl RequestMetrics {
    /// Summarize a finished lifecycle.
    pub fn from_lifecycle(
        request_id: impl Into<String>,
        route: Option<String>,
        status_code: u16,
        cache_status: impl ToString,
        lifecycle: &RequestLifecycle,
    ) -> Self {
        let timing = lifecycle.timing();
        let lookup_end = if lifecycle.served_from_cache() {
            RequestPhase::CacheHit.name()
        } else {
            RequestPhase::RouteMatched.name()
        };

        Self {
            request_id: request_id.into(),
            route,
            status_code,
            cache_status: cache_status.to_string(),
            cache_lookup_us: timing
                .between(RequestPhase::CacheLookup.name(), lookup_end)
                .map(micros),
            store_us: timing
                .between(RequestPhase::StoreCall.name(), RequestPhase::ResponseBuilt.name())
                .map(micros),
            total_duration_us: micros(timing.elapsed()),
        }
    }

    /// Emit as a single info line.
    pub fn log(&self, logger: &StructuredLogger) {
        let mut line = logger
            .info_builder("request completed")
            .field_u64("status", u64::from(self.status_code))
            .field("cache_status", self.cache_status.clone())
            .field_u64("total_us", self.total_duration_us);
        if let Some(lookup) = self.cache_lookup_us {
            line = line.field_u64("cache_lookup_us", lookup);
        }
        if let Some(store) = self.store_us {
            line = line.field_u64("store_us", store);
        }
        line.emit();
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
