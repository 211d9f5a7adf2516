//! Glob expansion endpoint.
//!
//! `GET|POST /metrics/expand` (also served as `/render/expand`) takes one or
//! more `query` glob patterns, asks the configured resolver to expand them and
//! answers `{"results":[...]}` with every matched path except internal tag
//! index entries.
//!
//! Every request yields exactly one access log entry, whatever the outcome.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, warn};

use metricfront_lib::{Decision, FlattenedResult, RequestContext};
use metricfront_service_shared::{
    extract_or_generate_request_id, health_live, health_ready, metrics_handler,
    record_backend_requests, record_expand_outcome, record_expand_results, AccessLogEntry,
    AccessLogGuard, AppState, ExpandRequest, FormValues, HttpFailure, JsonResponse,
    MetricsConfig, RequestId, RequestTrackingLayer, Validate,
};

/// Handler name recorded in access log entries.
pub const HANDLER_NAME: &str = "expand";

/// Upper bound on urlencoded POST bodies.
pub const MAX_FORM_BYTES: usize = 1024 * 1024;

/// Paths the expand handler is served on.
pub const EXPAND_PATHS: [&str; 2] = ["/metrics/expand", "/render/expand"];

/// Build the service router: expand endpoint, probes and metrics exposition.
pub fn build_router(state: AppState, metrics: &MetricsConfig) -> Router {
    let mut router = Router::new();
    for path in EXPAND_PATHS {
        router = router.route(path, get(expand_handler).post(expand_handler));
    }

    router = router
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready));

    if metrics.enabled {
        router = router.route(&metrics.path, get(metrics_handler));
    }

    router
        .layer(CatchPanicLayer::new())
        .layer(RequestTrackingLayer)
        .with_state(state)
}

/// Reply of the expand handler.
#[derive(Debug)]
enum ExpandReply {
    Success(JsonResponse),
    Error(HttpFailure),
}

impl IntoResponse for ExpandReply {
    fn into_response(self) -> Response {
        match self {
            ExpandReply::Success(body) => body.into_response(),
            ExpandReply::Error(failure) => failure.into_response(),
        }
    }
}

/// Handle `GET|POST /metrics/expand`.
pub async fn expand_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .extensions
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(|| extract_or_generate_request_id(&parts.headers));

    let entry = AccessLogEntry::from_request_parts(
        HANDLER_NAME,
        request_id.as_str(),
        &parts,
        &state.config().headers_to_log,
    );
    let mut guard = AccessLogGuard::new(state.access_log(), entry);

    let body = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            let failure = HttpFailure::bad_request(format!("invalid request body: {}", e));
            return reject(&mut guard, failure, "bad_request").into_response();
        }
    };

    let form = FormValues::from_request(&parts, &body);
    let request = ExpandRequest::from_form(&form);
    guard.set_format(&request.format);

    expand(&state, &request_id, &request, &mut guard)
        .await
        .into_response()
}

async fn expand(
    state: &AppState,
    request_id: &RequestId,
    request: &ExpandRequest,
    guard: &mut AccessLogGuard,
) -> ExpandReply {
    if let Err(failure) = request.validate() {
        return reject(guard, *failure, "bad_request");
    }

    let query = match request.to_glob_query(state.date_resolver(), Utc::now().timestamp()) {
        Ok(query) => query,
        Err(failure) => return reject(guard, *failure, "bad_request"),
    };

    debug!(
        request_id = %request_id,
        patterns = query.patterns().len(),
        from = query.start_epoch(),
        until = query.stop_epoch(),
        "expanding globs"
    );

    let ctx = RequestContext::new(request_id.as_str());
    let outcome = state.resolver().find(&ctx, &query).await;
    if let Some(stats) = &outcome.stats {
        guard.merge_stats(stats);
        record_backend_requests(stats.backend_request_count);
    }

    let (result, kind) = match state.policy().decide(outcome.result, outcome.error) {
        Decision::Proceed { result, kind } => (result, kind),
        Decision::Fail(failure) => {
            return reject(guard, HttpFailure::from_find_failure(failure), "resolver_error");
        }
    };

    let flattened = FlattenedResult::from_glob_result(&result);
    let body = match flattened.to_json() {
        Ok(body) => body,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "failed to encode expand response");
            return reject(guard, HttpFailure::internal_error(e.to_string()), "internal_error");
        }
    };

    guard.succeed(StatusCode::OK);
    record_expand_outcome(kind.as_str());
    record_expand_results(flattened.len());

    ExpandReply::Success(JsonResponse::new(body).with_callback(request.callback()))
}

fn reject(guard: &mut AccessLogGuard, failure: HttpFailure, outcome: &'static str) -> ExpandReply {
    guard.fail(&failure);
    record_expand_outcome(outcome);
    ExpandReply::Error(failure)
}
