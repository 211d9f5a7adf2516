//! Plain-text failure responses.
//!
//! Failures are opaque to clients: the body is a single line of text and
//! diagnostic detail travels only in the access log through
//! [`HttpFailure::reason`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use metricfront_lib::{Error as LibError, FindFailure};

/// A request that ended without a successful expand response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// Status sent to the client.
    pub status: StatusCode,

    /// Text sent to the client.
    pub body: String,

    /// Failure reason recorded in the access log.
    pub reason: String,

    /// Whether the access log entry is logged as an operational error.
    pub elevated: bool,
}

impl HttpFailure {
    /// 400 for unusable client input. The message is both body and reason.
    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::BAD_REQUEST,
            body: message.clone(),
            reason: message,
            elevated: false,
        }
    }

    /// 500 for faults inside the service.
    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::with_reason_phrase(StatusCode::INTERNAL_SERVER_ERROR, reason, true)
    }

    /// Terminal resolver failure after status normalization.
    pub fn from_find_failure(failure: FindFailure) -> Self {
        Self::with_reason_phrase(failure.status, failure.reason, failure.elevated)
    }

    fn with_reason_phrase(status: StatusCode, reason: impl Into<String>, elevated: bool) -> Self {
        Self {
            status,
            body: status.canonical_reason().unwrap_or("").to_string(),
            reason: reason.into(),
            elevated,
        }
    }
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status.as_u16(), self.reason)
    }
}

impl std::error::Error for HttpFailure {}

impl IntoResponse for HttpFailure {
    fn into_response(self) -> Response {
        let mut response = (self.status, format!("{}\n", self.body)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response
    }
}

/// Convert library errors to failures.
///
/// Client input errors become 400s carrying the error text. Resolver errors
/// passed here bypass the status policy and are reported as-is; the expand
/// handler always routes them through the policy first.
pub fn from_lib_error(error: &LibError) -> HttpFailure {
    match error {
        LibError::UnsupportedFormat(_) | LibError::MissingParameter(_) => {
            HttpFailure::bad_request(error.to_string())
        }
        LibError::Resolver(err) => HttpFailure::with_reason_phrase(
            err.status,
            err.message.clone(),
            err.status.is_server_error(),
        ),
        LibError::Serialize(_) | LibError::Http(_) => HttpFailure::internal_error(error.to_string()),
    }
}
