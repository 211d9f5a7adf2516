//! Shared infrastructure for metricfront HTTP services.
//!
//! - [`AppState`]: resolver, date resolver, access log sink and configuration
//! - [`ServiceConfig`]: environment-driven configuration
//! - [`ExpandRequest`]: form parameters of the expand endpoint, with validation
//! - [`HttpFailure`] and [`JsonResponse`]: failure and success responses
//! - [`AccessLogGuard`]: exactly-once access log records
//! - `health`, [`metrics`], [`logging`], [`middleware`]: operational glue
//!
//! # Architecture
//!
//! Handlers stay thin; resolution, status normalization and flattening live in
//! `metricfront-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Parse form values                                        │
//! │  - Validate parameters                                      │
//! │  - Call the resolver and apply the StatusPolicy             │
//! │  - Format response, flush the access log entry              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! [`test_utils`] provides a stub resolver and a recording access log. Enable
//! the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

pub mod access_log;
pub mod config;
mod failure;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod request;
mod response;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use access_log::{
    basic_auth_username, AccessLogEntry, AccessLogGuard, AccessLogSink, Severity, TracingAccessLog,
    ACCESS_LOG_TARGET, CLIENT_CLOSED_REQUEST,
};
pub use config::{ConfigError, ExpandConfig, ServiceConfig, DEFAULT_PORT};
pub use failure::{from_lib_error, HttpFailure};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_backend_requests, record_expand_outcome,
    record_expand_results, MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, RequestId, RequestTrackingLayer};
pub use request::{ExpandRequest, FormValues, Validate, DEFAULT_WINDOW_SECS};
pub use response::{JsonResponse, JSONP_CONTENT_TYPE, JSON_CONTENT_TYPE};
pub use state::{AppState, AppStateError};
