//! Request lifecycle tracking.
//!
//! A request moves through a fixed, forward-only sequence of phases:
//!
//! ```text
//! Received -> PathDecoded -> SpecialCaseChecked -> CacheLookup
//!     -> CacheHit -> Responded
//!     -> RouteMatched -> StoreCall -> ResponseBuilt -> CacheStoreScheduled -> Responded
//! ```
//!
//! `Failed` is reachable from every non-terminal phase.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle phases for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPhase {
    /// Request received, processing started.
    Received,
    /// Path has been percent-decoded.
    PathDecoded,
    /// Uncached special paths have been checked.
    SpecialCaseChecked,
    /// Response cache consulted.
    CacheLookup,
    /// Response served from cache.
    CacheHit,
    /// Route selected on a cache miss.
    RouteMatched,
    /// Backing store consulted.
    StoreCall,
    /// Response built from store data.
    ResponseBuilt,
    /// Cache write handed to the background.
    CacheStoreScheduled,
    /// Response handed back to the caller.
    Responded,
    /// An error occurred.
    Failed(String),
}

impl RequestPhase {
    /// Short name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::PathDecoded => "path_decoded",
            Self::SpecialCaseChecked => "special_case_checked",
            Self::CacheLookup => "cache_lookup",
            Self::CacheHit => "cache_hit",
            Self::RouteMatched => "route_matched",
            Self::StoreCall => "store_call",
            Self::ResponseBuilt => "response_built",
            Self::CacheStoreScheduled => "cache_store_scheduled",
            Self::Responded => "responded",
            Self::Failed(_) => "failed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Received => 0,
            Self::PathDecoded => 1,
            Self::SpecialCaseChecked => 2,
            Self::CacheLookup => 3,
            Self::CacheHit => 4,
            Self::RouteMatched => 4,
            Self::StoreCall => 5,
            Self::ResponseBuilt => 6,
            Self::CacheStoreScheduled => 7,
            Self::Responded => 8,
            Self::Failed(_) => 9,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Responded | Self::Failed(_))
    }
}

/// Error for an illegal phase transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Forward-only lifecycle of one request.
#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    current: RequestPhase,
    history: Vec<(RequestPhase, Duration)>,
    timing: TimingContext,
}

impl RequestLifecycle {
    /// Start a lifecycle in the `Received` phase.
    pub fn start() -> Self {
        let timing = TimingContext::new();
        Self {
            current: RequestPhase::Received,
            history: vec![(RequestPhase::Received, Duration::ZERO)],
            timing,
        }
    }

    /// Move to `next`.
    ///
    /// Transitions never go back, never repeat a phase, and a cache hit
    /// never continues into route matching.
    pub fn advance(&mut self, next: RequestPhase) -> Result<(), LifecycleError> {
        let illegal = self.current.is_terminal()
            || next == RequestPhase::Received
            || (!matches!(next, RequestPhase::Failed(_)) && next.rank() <= self.current.rank())
            || (self.current == RequestPhase::CacheHit
                && !matches!(next, RequestPhase::Responded | RequestPhase::Failed(_)));

        if illegal {
            return Err(LifecycleError {
                from: self.current.name(),
                to: next.name(),
            });
        }

        self.timing.mark(next.name());
        self.history.push((next.clone(), self.timing.elapsed()));
        self.current = next;
        Ok(())
    }

    /// The current phase.
    pub fn current(&self) -> &RequestPhase {
        &self.current
    }

    /// Phases visited so far with their offset from the start.
    pub fn history(&self) -> &[(RequestPhase, Duration)] {
        &self.history
    }

    /// Whether the request was answered from cache.
    pub fn served_from_cache(&self) -> bool {
        self.history
            .iter()
            .any(|(phase, _)| *phase == RequestPhase::CacheHit)
    }

    /// Timing marks recorded for each phase.
    pub fn timing(&self) -> &TimingContext {
        &self.timing
    }
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Offset of a named mark from the start.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Duration between two marks, if both were recorded in order.
    pub fn between(&self, from: &str, to: &str) -> Option<Duration> {
        let from = self.marks.get(from)?;
        let to = self.marks.get(to)?;
        to.checked_duration_since(*from)
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(phases: &[RequestPhase]) -> Result<RequestLifecycle, LifecycleError> {
        let mut lifecycle = RequestLifecycle::start();
        for phase in phases {
            lifecycle.advance(phase.clone())?;
        }
        Ok(lifecycle)
    }

    #[test]
    fn test_cache_miss_path() {
        let lifecycle = walk(&[
            RequestPhase::PathDecoded,
            RequestPhase::SpecialCaseChecked,
            RequestPhase::CacheLookup,
            RequestPhase::RouteMatched,
            RequestPhase::StoreCall,
            RequestPhase::ResponseBuilt,
            RequestPhase::CacheStoreScheduled,
            RequestPhase::Responded,
        ])
        .unwrap();
        assert_eq!(lifecycle.current(), &RequestPhase::Responded);
        assert!(!lifecycle.served_from_cache());
        assert_eq!(lifecycle.history().len(), 9);
    }

    #[test]
    fn test_cache_hit_path() {
        let lifecycle = walk(&[
            RequestPhase::PathDecoded,
            RequestPhase::SpecialCaseChecked,
            RequestPhase::CacheLookup,
            RequestPhase::CacheHit,
            RequestPhase::Responded,
        ])
        .unwrap();
        assert!(lifecycle.served_from_cache());
    }

    #[test]
    fn test_cache_hit_cannot_route() {
        let err = walk(&[
            RequestPhase::PathDecoded,
            RequestPhase::SpecialCaseChecked,
            RequestPhase::CacheLookup,
            RequestPhase::CacheHit,
            RequestPhase::RouteMatched,
        ])
        .unwrap_err();
        assert_eq!(err.from, "cache_hit");
        assert_eq!(err.to, "route_matched");
    }

    #[test]
    fn test_no_going_back() {
        let err = walk(&[RequestPhase::CacheLookup, RequestPhase::PathDecoded]).unwrap_err();
        assert_eq!(err.to_string(), "illegal lifecycle transition cache_lookup -> path_decoded");
    }

    #[test]
    fn test_phases_may_be_skipped() {
        // Special paths answer straight after the check.
        let lifecycle = walk(&[
            RequestPhase::PathDecoded,
            RequestPhase::SpecialCaseChecked,
            RequestPhase::Responded,
        ])
        .unwrap();
        assert!(lifecycle.current().is_terminal());
    }

    #[test]
    fn test_failure_from_any_phase() {
        let lifecycle = walk(&[
            RequestPhase::PathDecoded,
            RequestPhase::SpecialCaseChecked,
            RequestPhase::CacheLookup,
            RequestPhase::RouteMatched,
            RequestPhase::StoreCall,
            RequestPhase::Failed("store unavailable".into()),
        ])
        .unwrap();
        assert_eq!(lifecycle.current().name(), "failed");
    }

    #[test]
    fn test_terminal_is_final() {
        let err = walk(&[RequestPhase::Responded, RequestPhase::Failed("late".into())]).unwrap_err();
        assert_eq!(err.from, "responded");
    }

    #[test]
    fn test_timing_marks() {
        let mut timing = TimingContext::new();
        timing.mark("a");
        timing.mark("b");
        assert!(timing.since_start("a").is_some());
        assert!(timing.between("a", "b").is_some());
        assert!(timing.between("a", "missing").is_none());
    }
}
