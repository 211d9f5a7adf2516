//! Per-request access log records.
//!
//! Every request produces exactly one [`AccessLogEntry`]. The entry is owned
//! by an [`AccessLogGuard`] created when the request arrives; handlers fill in
//! outcome fields as they go, and the guard hands the entry to its
//! [`AccessLogSink`] when it is dropped. Early returns, errors, panics and
//! cancelled requests all pass through the same drop, so the flush happens
//! once on every path.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use base64::Engine;

use metricfront_lib::RequestStats;

use crate::failure::HttpFailure;

/// Tracing target used for access log events.
pub const ACCESS_LOG_TARGET: &str = "access";

/// Status recorded when the client went away before an outcome was set.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Structured outcome record of a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessLogEntry {
    pub handler: String,
    pub request_id: String,
    pub username: String,
    pub peer_ip: String,
    pub peer_port: String,
    pub host: String,
    pub referer: String,
    /// Path and query of the request.
    pub url: String,
    /// Request target exactly as received.
    pub uri: String,
    /// Raw value of the `format` parameter.
    pub format: String,
    pub request_headers: BTreeMap<String, String>,

    pub http_code: u16,
    pub reason: String,
    pub backend_requests: u64,
    pub total_metrics_count: u64,
    pub runtime_secs: f64,
}

impl AccessLogEntry {
    /// Capture the identity fields of a request.
    pub fn from_request_parts(
        handler: &str,
        request_id: &str,
        parts: &Parts,
        headers_to_log: &[String],
    ) -> Self {
        let (peer_ip, peer_port) = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| (addr.ip().to_string(), addr.port().to_string()))
            .unwrap_or_default();

        let host = header_str(&parts.headers, header::HOST.as_str())
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            handler: handler.to_string(),
            request_id: request_id.to_string(),
            username: basic_auth_username(&parts.headers).unwrap_or_default(),
            peer_ip,
            peer_port,
            host,
            referer: header_str(&parts.headers, header::REFERER.as_str()).unwrap_or_default(),
            url: parts
                .uri
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_else(|| parts.uri.path().to_string()),
            uri: parts.uri.to_string(),
            request_headers: selected_headers(&parts.headers, headers_to_log),
            ..Self::default()
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn selected_headers(headers: &HeaderMap, names: &[String]) -> BTreeMap<String, String> {
    names
        .iter()
        .filter_map(|name| header_str(headers, name).map(|value| (name.clone(), value)))
        .collect()
}

/// Username from `Authorization: Basic` credentials, if any.
pub fn basic_auth_username(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (username, _) = credentials.split_once(':')?;
    Some(username.to_string())
}

/// Severity an entry is recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    /// Operational errors (status >= 500).
    Elevated,
}

/// Destination for finished access log entries.
pub trait AccessLogSink: Send + Sync {
    fn record(&self, entry: &AccessLogEntry, severity: Severity);
}

/// Sink emitting one `tracing` event per entry on the `access` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAccessLog;

impl AccessLogSink for TracingAccessLog {
    fn record(&self, entry: &AccessLogEntry, severity: Severity) {
        macro_rules! emit {
            ($level:ident, $message:literal) => {
                tracing::$level!(
                    target: ACCESS_LOG_TARGET,
                    handler = %entry.handler,
                    request_id = %entry.request_id,
                    username = %entry.username,
                    peer_ip = %entry.peer_ip,
                    peer_port = %entry.peer_port,
                    host = %entry.host,
                    referer = %entry.referer,
                    url = %entry.url,
                    uri = %entry.uri,
                    format = %entry.format,
                    request_headers = ?entry.request_headers,
                    http_code = entry.http_code,
                    reason = %entry.reason,
                    backend_requests = entry.backend_requests,
                    total_metrics_count = entry.total_metrics_count,
                    runtime_secs = entry.runtime_secs,
                    $message
                )
            };
        }

        match severity {
            Severity::Elevated => emit!(error, "request failed"),
            Severity::Normal => emit!(info, "request served"),
        }
    }
}

/// Owns the access log entry of one request and flushes it on drop.
pub struct AccessLogGuard {
    sink: Arc<dyn AccessLogSink>,
    entry: AccessLogEntry,
    started: Instant,
    elevated: bool,
}

impl AccessLogGuard {
    pub fn new(sink: Arc<dyn AccessLogSink>, entry: AccessLogEntry) -> Self {
        Self {
            sink,
            entry,
            started: Instant::now(),
            elevated: false,
        }
    }

    pub fn set_format(&mut self, format: &str) {
        self.entry.format = format.to_string();
    }

    /// Backend statistics; merged whether or not the request succeeds.
    pub fn merge_stats(&mut self, stats: &RequestStats) {
        self.entry.backend_requests = stats.backend_request_count;
        self.entry.total_metrics_count += stats.total_metrics_count;
    }

    pub fn succeed(&mut self, status: StatusCode) {
        self.entry.http_code = status.as_u16();
    }

    pub fn fail(&mut self, failure: &HttpFailure) {
        self.entry.http_code = failure.status.as_u16();
        self.entry.reason = failure.reason.clone();
        self.elevated = failure.elevated;
    }
}

impl Drop for AccessLogGuard {
    fn drop(&mut self) {
        if self.entry.http_code == 0 {
            if std::thread::panicking() {
                self.entry.http_code = StatusCode::INTERNAL_SERVER_ERROR.as_u16();
                self.entry.reason = "handler panicked".to_string();
                self.elevated = true;
            } else {
                // The request future was dropped mid-flight.
                self.entry.http_code = CLIENT_CLOSED_REQUEST;
                self.entry.reason = "client closed request".to_string();
            }
        }
        self.entry.runtime_secs = self.started.elapsed().as_secs_f64();

        let severity = if self.elevated {
            Severity::Elevated
        } else {
            Severity::Normal
        };
        self.sink.record(&self.entry, severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingAccessLog;
    use axum::body::Body;
    use axum::http::Request;

    fn parts(request: Request<Body>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_identity_fields_from_request() {
        let mut request = Request::builder()
            .uri("/metrics/expand?query=a.*&format=json")
            .header("host", "graphite.local")
            .header("referer", "http://grafana/d/1")
            .header("authorization", "Basic YWxpY2U6c2VjcmV0")
            .header("x-dashboard-id", "42")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 51234))));

        let entry = AccessLogEntry::from_request_parts(
            "expand",
            "req-1",
            &parts(request),
            &["x-dashboard-id".to_string(), "x-missing".to_string()],
        );

        assert_eq!(entry.handler, "expand");
        assert_eq!(entry.request_id, "req-1");
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.peer_ip, "10.0.0.7");
        assert_eq!(entry.peer_port, "51234");
        assert_eq!(entry.host, "graphite.local");
        assert_eq!(entry.referer, "http://grafana/d/1");
        assert_eq!(entry.url, "/metrics/expand?query=a.*&format=json");
        assert_eq!(entry.request_headers.len(), 1);
        assert_eq!(entry.request_headers["x-dashboard-id"], "42");
        assert_eq!(entry.http_code, 0);
    }

    #[test]
    fn test_identity_fields_without_connection_info() {
        let request = Request::builder()
            .uri("/metrics/expand")
            .body(Body::empty())
            .unwrap();
        let entry = AccessLogEntry::from_request_parts("expand", "req-2", &parts(request), &[]);
        assert!(entry.peer_ip.is_empty());
        assert!(entry.username.is_empty());
        assert!(entry.request_headers.is_empty());
    }

    #[test]
    fn test_basic_auth_username() {
        let mut headers = HeaderMap::new();
        assert_eq!(basic_auth_username(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(basic_auth_username(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic !!!".parse().unwrap());
        assert_eq!(basic_auth_username(&headers), None);

        // "bob:" has an empty password
        headers.insert(header::AUTHORIZATION, "basic Ym9iOg==".parse().unwrap());
        assert_eq!(basic_auth_username(&headers).as_deref(), Some("bob"));
    }

    #[test]
    fn test_guard_flushes_once_on_drop() {
        let sink = Arc::new(RecordingAccessLog::default());
        {
            let mut guard = AccessLogGuard::new(sink.clone(), AccessLogEntry::default());
            guard.succeed(StatusCode::OK);
            assert!(sink.entries().is_empty());
        }

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.http_code, 200);
        assert_eq!(entries[0].1, Severity::Normal);
    }

    #[test]
    fn test_guard_records_failure_severity() {
        let sink = Arc::new(RecordingAccessLog::default());
        {
            let mut guard = AccessLogGuard::new(sink.clone(), AccessLogEntry::default());
            guard.fail(&HttpFailure::internal_error("boom"));
        }
        {
            let mut guard = AccessLogGuard::new(sink.clone(), AccessLogEntry::default());
            guard.fail(&HttpFailure::bad_request("missing parameter `query`"));
        }

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.reason, "boom");
        assert_eq!(entries[0].1, Severity::Elevated);
        assert_eq!(entries[1].0.http_code, 400);
        assert_eq!(entries[1].1, Severity::Normal);
    }

    #[test]
    fn test_guard_merges_stats() {
        let sink = Arc::new(RecordingAccessLog::default());
        {
            let mut guard = AccessLogGuard::new(sink.clone(), AccessLogEntry::default());
            guard.merge_stats(&RequestStats {
                backend_request_count: 3,
                total_metrics_count: 10,
            });
            guard.merge_stats(&RequestStats {
                backend_request_count: 2,
                total_metrics_count: 5,
            });
        }
        let entries = sink.entries();
        assert_eq!(entries[0].0.backend_requests, 2);
        assert_eq!(entries[0].0.total_metrics_count, 15);
    }

    #[test]
    fn test_guard_without_outcome_records_client_closed() {
        let sink = Arc::new(RecordingAccessLog::default());
        {
            let mut guard = AccessLogGuard::new(sink.clone(), AccessLogEntry::default());
            guard.merge_stats(&RequestStats {
                backend_request_count: 1,
                total_metrics_count: 0,
            });
        }

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.http_code, CLIENT_CLOSED_REQUEST);
        assert_eq!(entries[0].0.reason, "client closed request");
        assert_eq!(entries[0].0.backend_requests, 1);
        assert_eq!(entries[0].1, Severity::Normal);
    }

    #[test]
    fn test_guard_flushes_during_panic() {
        let sink = Arc::new(RecordingAccessLog::default());
        let panicking_sink = sink.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = AccessLogGuard::new(panicking_sink, AccessLogEntry::default());
            panic!("resolver blew up");
        });
        assert!(result.is_err());

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.http_code, 500);
        assert_eq!(entries[0].1, Severity::Elevated);
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let entry = AccessLogEntry {
            handler: "expand".to_string(),
            http_code: 503,
            ..AccessLogEntry::default()
        };
        TracingAccessLog.record(&entry, Severity::Elevated);
        TracingAccessLog.record(&entry, Severity::Normal);
    }
}
