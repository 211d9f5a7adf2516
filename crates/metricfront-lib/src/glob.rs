//! Glob query and result types exchanged with the resolver.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A validated expansion request: one or more patterns and a time window.
///
/// The pattern list is never empty; [`GlobQuery::new`] rejects an empty list
/// with [`Error::MissingParameter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobQuery {
    patterns: Vec<String>,
    start_epoch: i64,
    stop_epoch: i64,
}

impl GlobQuery {
    pub fn new(patterns: Vec<String>, start_epoch: i64, stop_epoch: i64) -> Result<Self> {
        if patterns.is_empty() {
            return Err(Error::MissingParameter("query"));
        }
        Ok(Self {
            patterns,
            start_epoch,
            stop_epoch,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Window start in unix seconds.
    pub fn start_epoch(&self) -> i64 {
        self.start_epoch
    }

    /// Window end in unix seconds.
    pub fn stop_epoch(&self) -> i64 {
        self.stop_epoch
    }
}

/// One concrete metric path matched by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobMatch {
    pub path: String,
    #[serde(default)]
    pub is_leaf: bool,
}

impl GlobMatch {
    pub fn leaf(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_leaf: true,
        }
    }

    pub fn branch(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_leaf: false,
        }
    }
}

/// Matches for a single pattern, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobMatches {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub matches: Vec<GlobMatch>,
}

/// Per-pattern match sets as returned by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobResult {
    #[serde(default)]
    pub metrics: Vec<GlobMatches>,
}

impl GlobResult {
    /// A result with no match sets at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of matches across every pattern.
    pub fn match_count(&self) -> usize {
        self.metrics.iter().map(|m| m.matches.len()).sum()
    }
}

/// Backend work performed while resolving a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub backend_request_count: u64,
    pub total_metrics_count: u64,
}
