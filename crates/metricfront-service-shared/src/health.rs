//! Health check handlers for Kubernetes probes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Body of `/health/live` and `/health/ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "ok" when the probe passes.
    pub status: String,
    pub service: String,
    pub version: String,

    /// Resolver the service forwards find requests to (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    /// Status answered when the resolver reports "not found" (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found_status: Option<u16>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            resolver: None,
            not_found_status: None,
        }
    }

    pub fn ready(service: &str, version: &str, resolver: String, not_found_status: u16) -> Self {
        Self {
            resolver: Some(resolver),
            not_found_status: Some(not_found_status),
            ..Self::alive(service, version)
        }
    }
}

/// Liveness probe. Does not touch the resolver.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"metricfront-service-shared","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe reporting the configured resolver.
///
/// The resolver is only contacted by expand requests, so readiness means the
/// state was built successfully.
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let status = HealthStatus::ready(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        state.resolver().describe(),
        state.policy().not_found_status().as_u16(),
    );
    (StatusCode::OK, Json(status))
}
