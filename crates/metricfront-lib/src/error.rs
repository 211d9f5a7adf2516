use http::StatusCode;
use thiserror::Error;

/// Convenient result alias for the metricfront library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested response format is not served by this endpoint.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A required request parameter was absent.
    #[error("missing parameter `{0}`")]
    MissingParameter(&'static str),

    /// The resolver reported a failure.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Encoding the flattened result failed.
    #[error("failed to encode expand response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Wrapper for HTTP client construction errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Failure reported by a [`Resolver`](crate::resolver::Resolver).
///
/// Every resolver failure declares the HTTP status it maps to. The status is
/// not necessarily an error code: backends report "nothing matched" as a
/// `404`, and some report usable partial answers with a `200`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolverError {
    pub status: StatusCode,
    pub message: String,
}

impl ResolverError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The patterns matched nothing.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// The backend could not be reached.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// The backend did not answer in time.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, message)
    }

    /// The backend answered with something that could not be decoded.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}
