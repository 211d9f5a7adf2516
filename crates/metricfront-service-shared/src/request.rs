//! Request parameters and validation for the expand endpoint.

use axum::http::{header, request::Parts, Method};
use url::form_urlencoded;

use metricfront_lib::{DateResolver, Error as LibError, GlobQuery, ResponseFormat};

use crate::failure::{from_lib_error, HttpFailure};

/// Default window length when `from` is absent.
pub const DEFAULT_WINDOW_SECS: i64 = 3600;

/// Validation trait for request types.
///
/// Returns a boxed [`HttpFailure`] to avoid large `Result::Err` variants.
pub trait Validate {
    fn validate(&self) -> Result<(), Box<HttpFailure>>;
}

/// Form values merged from a urlencoded POST body and the URL query string.
///
/// Body values come first, mirroring the usual form precedence, so the first
/// value of a repeated key is taken from the body when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    pub fn from_request(parts: &Parts, body: &[u8]) -> Self {
        let mut pairs = Vec::new();

        if parts.method == Method::POST && is_urlencoded(parts) {
            pairs.extend(form_urlencoded::parse(body).into_owned());
        }
        if let Some(query) = parts.uri.query() {
            pairs.extend(form_urlencoded::parse(query.as_bytes()).into_owned());
        }

        Self { pairs }
    }

    pub fn from_query(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        }
    }

    /// First value for `name`, or an empty string.
    pub fn value(&self, name: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Every value for `name`, in order.
    pub fn values(&self, name: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

fn is_urlencoded(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Raw expand request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandRequest {
    /// Raw `format` value as sent by the client.
    pub format: String,
    /// Optional JSONP callback name.
    pub jsonp: String,
    pub tz: String,
    pub from: String,
    pub until: String,
    /// Glob patterns in request order.
    pub queries: Vec<String>,
}

impl ExpandRequest {
    pub fn from_form(form: &FormValues) -> Self {
        Self {
            format: form.value("format").to_string(),
            jsonp: form.value("jsonp").to_string(),
            tz: form.value("tz").to_string(),
            from: form.value("from").to_string(),
            until: form.value("until").to_string(),
            queries: form.values("query"),
        }
    }

    /// Accepted response format; fails for anything but JSON.
    pub fn response_format(&self) -> Result<ResponseFormat, Box<HttpFailure>> {
        ResponseFormat::parse(&self.format).map_err(|e| Box::new(from_lib_error(&e)))
    }

    /// JSONP callback, if one was requested.
    ///
    /// Only meaningful after [`Validate::validate`] has accepted the name.
    pub fn callback(&self) -> Option<&str> {
        Some(self.jsonp.as_str()).filter(|cb| !cb.is_empty())
    }

    /// Build the resolver query, resolving `from`/`until` relative to `now`.
    pub fn to_glob_query(
        &self,
        dates: &dyn DateResolver,
        now_epoch: i64,
    ) -> Result<GlobQuery, Box<HttpFailure>> {
        let start = dates.resolve(&self.from, &self.tz, now_epoch - DEFAULT_WINDOW_SECS);
        let stop = dates.resolve(&self.until, &self.tz, now_epoch);

        GlobQuery::new(self.queries.clone(), start, stop).map_err(|e| Box::new(from_lib_error(&e)))
    }
}

impl Validate for ExpandRequest {
    fn validate(&self) -> Result<(), Box<HttpFailure>> {
        self.response_format()?;

        if let Some(callback) = self.callback() {
            if !is_callback_name(callback) {
                return Err(Box::new(HttpFailure::bad_request(format!(
                    "invalid jsonp callback: {callback}"
                ))));
            }
        }

        if self.queries.is_empty() {
            return Err(Box::new(from_lib_error(&LibError::MissingParameter(
                "query",
            ))));
        }

        Ok(())
    }
}

/// JavaScript identifier path such as `cb` or `jQuery.handlers.$expand_1`.
fn is_callback_name(name: &str) -> bool {
    name.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    })
}
