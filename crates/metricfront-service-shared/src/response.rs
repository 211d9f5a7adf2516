//! Encoded JSON responses with optional JSONP wrapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Content type of plain JSON bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of JSONP-wrapped bodies.
pub const JSONP_CONTENT_TYPE: &str = "text/javascript";

/// Successful response carrying an already-encoded JSON body.
///
/// With a callback the body becomes `callback(<json>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub body: Vec<u8>,
    pub callback: Option<String>,
}

impl JsonResponse {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: Option<&str>) -> Self {
        self.callback = callback.filter(|cb| !cb.is_empty()).map(str::to_string);
        self
    }

    pub fn content_type(&self) -> &'static str {
        if self.callback.is_some() {
            JSONP_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        }
    }

    /// Final bytes sent to the client.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.callback {
            Some(callback) => {
                let mut wrapped = Vec::with_capacity(callback.len() + self.body.len() + 2);
                wrapped.extend_from_slice(callback.as_bytes());
                wrapped.push(b'(');
                wrapped.extend_from_slice(&self.body);
                wrapped.push(b')');
                wrapped
            }
            None => self.body,
        }
    }
}

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_static(self.content_type());
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type)],
            self.into_bytes(),
        )
            .into_response()
    }
}
