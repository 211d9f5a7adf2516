//! Resolver abstraction and the HTTP backend client.
//!
//! A [`Resolver`] expands a [`GlobQuery`] into per-pattern match sets. The
//! call reports three independent pieces: an optional result, optional
//! backend statistics and an optional [`ResolverError`]. Statistics are
//! meaningful even when the call failed, since backend work may have happened.
//!
//! Cancellation follows the caller: dropping the `find` future aborts the
//! in-flight backend request. No timeout is applied here.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, ResolverError, Result};
use crate::glob::{GlobQuery, GlobResult, RequestStats};

/// Header used to forward the correlation id to the backend.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context handed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation id shared with the access log.
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

/// Everything a resolver call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOutcome {
    pub result: Option<GlobResult>,
    pub stats: Option<RequestStats>,
    pub error: Option<ResolverError>,
}

impl FindOutcome {
    pub fn resolved(result: GlobResult, stats: Option<RequestStats>) -> Self {
        Self {
            result: Some(result),
            stats,
            error: None,
        }
    }

    pub fn failed(error: ResolverError, stats: Option<RequestStats>) -> Self {
        Self {
            result: None,
            stats,
            error: Some(error),
        }
    }

    /// Attach a result to a failed outcome (partial answers).
    pub fn with_result(mut self, result: GlobResult) -> Self {
        self.result = Some(result);
        self
    }
}

/// Expands glob patterns into concrete metric paths.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn find(&self, ctx: &RequestContext, query: &GlobQuery) -> FindOutcome;

    /// Short description for health and startup logs.
    fn describe(&self) -> String;
}

/// Resolver backed by a remote find service speaking JSON.
///
/// The query is posted to `<base_url>/metrics/find`; a successful response
/// body is a [`GlobResult`].
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: Client,
    endpoint: String,
}

impl HttpResolver {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().build().map_err(Error::Http)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        let endpoint = format!("{}/metrics/find", base_url.trim_end_matches('/'));
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn find(&self, ctx: &RequestContext, query: &GlobQuery) -> FindOutcome {
        let mut stats = RequestStats {
            backend_request_count: 1,
            total_metrics_count: 0,
        };

        debug!(
            request_id = %ctx.request_id,
            endpoint = %self.endpoint,
            patterns = query.patterns().len(),
            "sending find request"
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .header(REQUEST_ID_HEADER, &ctx.request_id)
            .json(query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FindOutcome::failed(classify_transport_error(&e), Some(stats)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match body.trim() {
                "" => format!("resolver returned {}", status),
                text => text.to_string(),
            };
            return FindOutcome::failed(ResolverError::new(status, message), Some(stats));
        }

        match response.json::<GlobResult>().await {
            Ok(result) => {
                stats.total_metrics_count = result.match_count() as u64;
                FindOutcome::resolved(result, Some(stats))
            }
            Err(e) => FindOutcome::failed(classify_transport_error(&e), Some(stats)),
        }
    }

    fn describe(&self) -> String {
        format!("http {}", self.endpoint)
    }
}

fn classify_transport_error(error: &reqwest::Error) -> ResolverError {
    if error.is_timeout() {
        ResolverError::timeout(format!("resolver timed out: {}", error))
    } else if error.is_connect() {
        ResolverError::unavailable(format!("resolver unreachable: {}", error))
    } else {
        ResolverError::bad_gateway(format!("invalid resolver response: {}", error))
    }
}
