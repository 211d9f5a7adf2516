//! metricfront glob expansion HTTP service.
//!
//! # Endpoints
//!
//! - `GET|POST /metrics/expand` (alias `/render/expand`) - expand glob patterns
//! - `GET /metrics` - Prometheus metrics endpoint
//! - `GET /health/live` - Kubernetes liveness probe
//! - `GET /health/ready` - Kubernetes readiness probe
//!
//! # Configuration
//!
//! - `RESOLVER_URL` - Base URL of the find backend (required)
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `NOT_FOUND_STATUS_CODE` - Status for "not found" resolver answers (default: 200)
//! - `DEFAULT_TIMEZONE` - Timezone for absolute dates (default: UTC)
//! - `LOG_HEADERS` - Request headers copied into the access log
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text

use std::net::SocketAddr;

use tracing::{error, info};

use metricfront_service_expand::build_router;
use metricfront_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_service("expand");
    init_logging(&logging_config);

    let mut metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
        metrics_config.enabled = false;
    }

    let config = ServiceConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;

    info!(
        port = config.port,
        resolver_url = %config.resolver_url,
        not_found_status = config.expand.not_found_status.as_u16(),
        "starting expand service"
    );

    let state = AppState::from_service_config(&config).map_err(|e| {
        error!(error = %e, "failed to build application state");
        e
    })?;

    let app = build_router(state, &metrics_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("expand service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
