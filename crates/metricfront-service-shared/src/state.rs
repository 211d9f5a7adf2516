//! Application state for HTTP microservices.
//!
//! Holds the resolver, the date resolver, the access log sink and the
//! read-only expand configuration. Everything is fixed at construction and
//! shared between requests through an `Arc`.

use std::sync::Arc;

use metricfront_lib::{
    DateResolver, DefaultDateResolver, Error as LibError, HttpResolver, Resolver, StatusPolicy,
};

use crate::access_log::{AccessLogSink, TracingAccessLog};
use crate::config::{ExpandConfig, ServiceConfig};

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// The resolver client could not be built.
    ResolverInit(LibError),

    /// The resolver URL is not an http(s) URL.
    InvalidResolverUrl(String),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolverInit(e) => write!(f, "failed to build resolver client: {}", e),
            Self::InvalidResolverUrl(url) => write!(f, "invalid resolver url: {}", url),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ResolverInit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        Self::ResolverInit(err)
    }
}

/// Shared application state for all axum handlers.
///
/// Cheaply cloneable; share it via axum's `State` extractor.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, extract::State};
/// use metricfront_service_shared::{AppState, ServiceConfig};
///
/// async fn handler(State(state): State<AppState>) {
///     let resolver = state.resolver();
///     // ... use resolver
/// }
///
/// let config = ServiceConfig::from_env().unwrap();
/// let state = AppState::from_service_config(&config).unwrap();
/// let app = Router::new()
///     .route("/metrics/expand", get(handler))
///     .with_state(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    resolver: Arc<dyn Resolver>,
    dates: Arc<dyn DateResolver>,
    access_log: Arc<dyn AccessLogSink>,
    policy: StatusPolicy,
    config: ExpandConfig,
}

impl AppState {
    /// Build state with an HTTP resolver pointed at `config.resolver_url`.
    pub fn from_service_config(config: &ServiceConfig) -> Result<Self, AppStateError> {
        let url = config.resolver_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppStateError::InvalidResolverUrl(url.to_string()));
        }

        let resolver = HttpResolver::new(url)?;
        tracing::info!(endpoint = %resolver.endpoint(), "resolver configured");

        Ok(Self::new(Arc::new(resolver), config.expand.clone()))
    }

    /// Build state around any resolver, with the default date resolver and
    /// the tracing access log.
    pub fn new(resolver: Arc<dyn Resolver>, config: ExpandConfig) -> Self {
        let dates = Arc::new(DefaultDateResolver::new(config.default_timezone));
        Self::from_components(resolver, dates, Arc::new(TracingAccessLog), config)
    }

    /// Create application state from explicit components.
    ///
    /// This is useful for testing with stub collaborators.
    pub fn from_components(
        resolver: Arc<dyn Resolver>,
        dates: Arc<dyn DateResolver>,
        access_log: Arc<dyn AccessLogSink>,
        config: ExpandConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                resolver,
                dates,
                access_log,
                policy: StatusPolicy::new(config.not_found_status),
                config,
            }),
        }
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.inner.resolver.as_ref()
    }

    pub fn date_resolver(&self) -> &dyn DateResolver {
        self.inner.dates.as_ref()
    }

    /// Sink receiving finished access log entries.
    pub fn access_log(&self) -> Arc<dyn AccessLogSink> {
        Arc::clone(&self.inner.access_log)
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.inner.policy
    }

    pub fn config(&self) -> &ExpandConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("resolver", &self.inner.resolver.describe())
            .field("not_found_status", &self.inner.config.not_found_status)
            .field("default_timezone", &self.inner.config.default_timezone)
            .finish()
    }
}
