//! Status normalization for resolver outcomes.
//!
//! Resolvers report "the patterns matched nothing" as an error carrying a
//! `404` rather than as an empty success, and occasionally attach a usable
//! result to an error coded `200`. [`StatusPolicy`] turns those pairs back into
//! conventional HTTP outcomes:
//!
//! ```text
//! no error                    -> proceed with result (missing = empty)
//! error 200 + result          -> proceed with result, error dropped
//! error 404                   -> rewritten to the configured not-found status
//! status < 300                -> proceed with an empty result
//! status >= 300               -> fail with that status (elevated when >= 500)
//! ```

use http::StatusCode;

use crate::error::ResolverError;
use crate::glob::GlobResult;

/// How a successful outcome was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessKind {
    /// The resolver returned without error.
    Resolved,
    /// A `200`-coded error arrived together with a result; the result was used.
    Tolerated,
    /// A `404` was rewritten to a sub-300 status and answered with no matches.
    NotFoundOverride,
    /// Any other sub-300 error status, answered with no matches.
    BenignEmpty,
}

impl SuccessKind {
    /// Metric label for this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessKind::Resolved => "resolved",
            SuccessKind::Tolerated => "tolerated",
            SuccessKind::NotFoundOverride => "not_found_override",
            SuccessKind::BenignEmpty => "benign_empty",
        }
    }
}

/// A terminal resolver failure after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindFailure {
    pub status: StatusCode,
    /// Error text for the access log. Never shown to clients.
    pub reason: String,
    /// Whether the outcome counts as an operational error (status >= 500).
    pub elevated: bool,
}

impl FindFailure {
    /// Standard reason phrase for the failure status, used as response body.
    pub fn reason_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }
}

/// Result of applying the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed { result: GlobResult, kind: SuccessKind },
    Fail(FindFailure),
}

/// Reconciles resolver `(result, error)` pairs into HTTP outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    not_found_status: StatusCode,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl StatusPolicy {
    /// `not_found_status` replaces any `404` reported by the resolver.
    pub fn new(not_found_status: StatusCode) -> Self {
        Self { not_found_status }
    }

    pub fn not_found_status(&self) -> StatusCode {
        self.not_found_status
    }

    pub fn decide(&self, result: Option<GlobResult>, error: Option<ResolverError>) -> Decision {
        let Some(error) = error else {
            return Decision::Proceed {
                result: result.unwrap_or_default(),
                kind: SuccessKind::Resolved,
            };
        };

        if error.status == StatusCode::OK {
            if let Some(result) = result {
                return Decision::Proceed {
                    result,
                    kind: SuccessKind::Tolerated,
                };
            }
        }

        let mut status = error.status;
        let mut kind = SuccessKind::BenignEmpty;
        if status == StatusCode::NOT_FOUND {
            status = self.not_found_status;
            kind = SuccessKind::NotFoundOverride;
        }

        if status.as_u16() < 300 {
            return Decision::Proceed {
                result: GlobResult::empty(),
                kind,
            };
        }

        Decision::Fail(FindFailure {
            status,
            reason: error.message,
            elevated: status.as_u16() >= 500,
        })
    }
}
