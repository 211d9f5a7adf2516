//! Test doubles for handler testing.
//!
//! Enable the `test-utils` feature to use these from dependent crates.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use metricfront_lib::{
    FindOutcome, GlobMatch, GlobMatches, GlobQuery, GlobResult, RequestContext, RequestStats,
    Resolver, ResolverError,
};

use crate::access_log::{AccessLogEntry, AccessLogSink, Severity};
use crate::config::ExpandConfig;
use crate::state::AppState;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolver answering every call with a fixed outcome and remembering calls.
#[derive(Debug, Default)]
pub struct StubResolver {
    outcome: FindOutcome,
    calls: Mutex<Vec<(RequestContext, GlobQuery)>>,
}

impl StubResolver {
    pub fn new(outcome: FindOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// No result and no error.
    pub fn empty() -> Self {
        Self::new(FindOutcome::default())
    }

    pub fn resolving(result: GlobResult) -> Self {
        let stats = RequestStats {
            backend_request_count: 1,
            total_metrics_count: result.match_count() as u64,
        };
        Self::new(FindOutcome::resolved(result, Some(stats)))
    }

    pub fn failing(error: ResolverError) -> Self {
        Self::new(FindOutcome::failed(
            error,
            Some(RequestStats {
                backend_request_count: 1,
                total_metrics_count: 0,
            }),
        ))
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_call(&self) -> Option<(RequestContext, GlobQuery)> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn find(&self, ctx: &RequestContext, query: &GlobQuery) -> FindOutcome {
        lock(&self.calls).push((ctx.clone(), query.clone()));
        self.outcome.clone()
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

/// Resolver that panics on every call.
#[derive(Debug, Default)]
pub struct PanickingResolver;

#[async_trait]
impl Resolver for PanickingResolver {
    async fn find(&self, _ctx: &RequestContext, query: &GlobQuery) -> FindOutcome {
        explode(query)
    }

    fn describe(&self) -> String {
        "panicking".to_string()
    }
}

fn explode(query: &GlobQuery) -> FindOutcome {
    panic!("resolver panicked on {:?}", query.patterns());
}

/// Resolver whose calls never complete.
#[derive(Debug, Default)]
pub struct PendingResolver {
    calls: Mutex<usize>,
}

impl PendingResolver {
    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl Resolver for PendingResolver {
    async fn find(&self, _ctx: &RequestContext, _query: &GlobQuery) -> FindOutcome {
        *lock(&self.calls) += 1;
        std::future::pending().await
    }

    fn describe(&self) -> String {
        "pending".to_string()
    }
}

/// Access log sink keeping every entry in memory.
#[derive(Debug, Default)]
pub struct RecordingAccessLog {
    entries: Mutex<Vec<(AccessLogEntry, Severity)>>,
}

impl RecordingAccessLog {
    pub fn entries(&self) -> Vec<(AccessLogEntry, Severity)> {
        lock(&self.entries).clone()
    }
}

impl AccessLogSink for RecordingAccessLog {
    fn record(&self, entry: &AccessLogEntry, severity: Severity) {
        lock(&self.entries).push((entry.clone(), severity));
    }
}

/// Build a resolver result from `(pattern, paths)` pairs.
pub fn glob_result(sets: &[(&str, &[&str])]) -> GlobResult {
    GlobResult {
        metrics: sets
            .iter()
            .map(|(name, paths)| GlobMatches {
                name: name.to_string(),
                matches: paths.iter().map(|p| GlobMatch::leaf(*p)).collect(),
            })
            .collect(),
    }
}

/// State around `resolver` with a recording access log.
pub fn test_state_with(
    resolver: Arc<dyn Resolver>,
    config: ExpandConfig,
) -> (AppState, Arc<RecordingAccessLog>) {
    let access_log = Arc::new(RecordingAccessLog::default());
    let dates = Arc::new(metricfront_lib::DefaultDateResolver::new(
        config.default_timezone,
    ));
    let state = AppState::from_components(resolver, dates, access_log.clone(), config);
    (state, access_log)
}

/// State with an empty stub resolver and default configuration.
pub fn test_state() -> AppState {
    test_state_with(Arc::new(StubResolver::empty()), ExpandConfig::default()).0
}
