//! Flattening of resolver match sets into the expand response.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::glob::GlobResult;

/// Prefix of internal tag-index pseudo-metrics. Paths starting with it are
/// bookkeeping entries and never reach clients.
pub const TAG_INDEX_PREFIX: &str = "_tag";

/// The only format served by the expand endpoint.
pub const JSON_FORMAT: &str = "json";

/// Response format requested through the `format` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
}

impl ResponseFormat {
    /// Parse the raw `format` value. An empty value selects JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "" | JSON_FORMAT => Ok(ResponseFormat::Json),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => JSON_FORMAT,
        }
    }
}

/// Flat list of matched paths in backend encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedResult {
    pub results: Vec<String>,
}

impl FlattenedResult {
    /// Walk every match set in order, dropping tag-index entries.
    ///
    /// Duplicates are kept and nothing is sorted.
    pub fn from_glob_result(result: &GlobResult) -> Self {
        let results = result
            .metrics
            .iter()
            .flat_map(|globs| globs.matches.iter())
            .filter(|m| !m.path.starts_with(TAG_INDEX_PREFIX))
            .map(|m| m.path.clone())
            .collect();

        Self { results }
    }

    /// Encode as `{"results":[...]}` terminated by a newline.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut body = serde_json::to_vec(self).map_err(Error::Serialize)?;
        body.push(b'\n');
        Ok(body)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Flatten and encode in one step.
pub fn expand_list(result: &GlobResult) -> Result<Vec<u8>> {
    FlattenedResult::from_glob_result(result).to_json()
}
