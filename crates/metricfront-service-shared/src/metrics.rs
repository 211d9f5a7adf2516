//! Prometheus metrics for the expand service.
//!
//! This module provides:
//! - [`MetricsConfig`]: whether metrics are exported and on which path
//! - [`init_metrics`]: install the Prometheus recorder
//! - [`metrics_handler`]: axum handler rendering the exposition text
//! - Expand-specific helpers recording outcomes and result sizes
//!
//! # Example
//!
//! ```no_run
//! use metricfront_service_shared::metrics::{MetricsConfig, init_metrics, metrics_handler};
//! use axum::{Router, routing::get};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("failed to initialize metrics");
//!
//! let app: Router = Router::new()
//!     .route(&config.path, get(metrics_handler));
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Counter of finished expand requests, labelled by outcome.
pub const EXPAND_TOTAL: &str = "metricfront_expand_total";

/// Histogram of paths returned per successful expand request.
pub const EXPAND_RESULTS: &str = "metricfront_expand_results";

/// Counter of backend requests reported by the resolver.
pub const BACKEND_REQUESTS_TOTAL: &str = "metricfront_backend_requests_total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path of the exposition endpoint (e.g. "/metrics").
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Create configuration from environment variables.
    ///
    /// - `METRICS_ENABLED`: "true" or "false" (default: true)
    /// - `METRICS_PATH`: path for the metrics endpoint (default: "/metrics")
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("METRICS_ENABLED")
            .map(|v| v.trim().to_lowercase() != "false")
            .unwrap_or(true);

        let path = lookup("METRICS_PATH")
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Install the Prometheus recorder.
///
/// Must run once at startup, before metrics are recorded. Without it every
/// `metrics` macro is a no-op.
///
/// # Errors
///
/// Fails when metrics are disabled, when a recorder is already installed, or
/// when the exporter cannot be built.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Prometheus exposition text.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

/// Count one finished expand request.
///
/// `outcome` is a success kind label (`resolved`, `tolerated`,
/// `not_found_override`, `benign_empty`) or a failure label such as
/// `bad_request`, `resolver_error` or `internal_error`.
pub fn record_expand_outcome(outcome: &'static str) {
    metrics::counter!(EXPAND_TOTAL, "outcome" => outcome).increment(1);
}

/// Record the number of paths returned by a successful expand request.
pub fn record_expand_results(count: usize) {
    metrics::histogram!(EXPAND_RESULTS).record(count as f64);
}

/// Add the backend requests reported by a resolver call.
pub fn record_backend_requests(count: u64) {
    if count > 0 {
        metrics::counter!(BACKEND_REQUESTS_TOTAL).increment(count);
    }
}
