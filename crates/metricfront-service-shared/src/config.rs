//! Service configuration read from the environment.
//!
//! Configuration is read once at startup and injected into
//! [`AppState`](crate::AppState); handlers never consult the environment.
//!
//! # Environment Variables
//!
//! - `SERVICE_PORT`: HTTP port (default: 8080)
//! - `RESOLVER_URL`: Base URL of the find backend (required)
//! - `NOT_FOUND_STATUS_CODE`: Status answered when the resolver reports 404
//!   (default: 200, meaning "empty result")
//! - `DEFAULT_TIMEZONE`: `UTC` or a fixed offset such as `+02:00` (default: UTC)
//! - `LOG_HEADERS`: Comma-separated request headers copied into the access log

use axum::http::StatusCode;
use chrono::FixedOffset;
use metricfront_lib::parse_timezone;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Per-request behaviour of the expand endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandConfig {
    /// Replaces any 404 reported by the resolver.
    pub not_found_status: StatusCode,
    /// Timezone for absolute dates when the request carries no `tz`.
    pub default_timezone: FixedOffset,
    /// Request headers copied into the access log (lowercase).
    pub headers_to_log: Vec<String>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            not_found_status: StatusCode::OK,
            default_timezone: parse_timezone("UTC")
                .unwrap_or_else(|| unreachable!("UTC is always a valid timezone")),
            headers_to_log: Vec::new(),
        }
    }
}

/// Process-level configuration for the expand service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub resolver_url: String,
    pub expand: ExpandConfig,
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// Lets tests supply variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("SERVICE_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid("SERVICE_PORT", &raw, "not a valid port"))?,
            None => DEFAULT_PORT,
        };

        let resolver_url = get("RESOLVER_URL").ok_or(ConfigError::Missing("RESOLVER_URL"))?;

        let not_found_status = match get("NOT_FOUND_STATUS_CODE") {
            Some(raw) => parse_status(&raw)?,
            None => StatusCode::OK,
        };

        let default_timezone = match get("DEFAULT_TIMEZONE") {
            Some(raw) => parse_timezone(&raw).ok_or_else(|| {
                ConfigError::invalid("DEFAULT_TIMEZONE", &raw, "expected UTC or an offset like +02:00")
            })?,
            None => ExpandConfig::default().default_timezone,
        };

        let headers_to_log = get("LOG_HEADERS")
            .map(|raw| parse_header_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            port,
            resolver_url: resolver_url.trim().to_string(),
            expand: ExpandConfig {
                not_found_status,
                default_timezone,
                headers_to_log,
            },
        })
    }
}

fn parse_status(raw: &str) -> Result<StatusCode, ConfigError> {
    let code: u16 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid("NOT_FOUND_STATUS_CODE", raw, "not a number"))?;
    if !(100..=599).contains(&code) {
        return Err(ConfigError::invalid(
            "NOT_FOUND_STATUS_CODE",
            raw,
            "must be between 100 and 599",
        ));
    }
    StatusCode::from_u16(code)
        .map_err(|_| ConfigError::invalid("NOT_FOUND_STATUS_CODE", raw, "not a valid status"))
}

fn parse_header_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect()
}

/// Error while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),

    /// A variable holds an unusable value.
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: &'static str) -> Self {
        Self::Invalid {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing required environment variable {}", name),
            Self::Invalid {
                name,
                value,
                reason,
            } => write!(f, "invalid value '{}' for {}: {}", value, name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}
