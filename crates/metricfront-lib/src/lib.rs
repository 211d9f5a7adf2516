//! metricfront library entry points.
//!
//! This crate holds the endpoint-independent pieces of the glob expansion
//! service: the query and result model, the [`Resolver`] abstraction with its
//! HTTP client, the [`StatusPolicy`] that normalizes resolver outcomes, the
//! flattening of match sets into the expand response, and date expression
//! resolution. HTTP glue lives in `metricfront-service-shared` and the
//! service binaries.

pub mod date;
pub mod error;
pub mod expand;
pub mod glob;
pub mod policy;
pub mod resolver;

pub use date::{parse_timezone, DateResolver, DefaultDateResolver};
pub use error::{Error, ResolverError, Result};
pub use expand::{expand_list, FlattenedResult, ResponseFormat, TAG_INDEX_PREFIX};
pub use glob::{GlobMatch, GlobMatches, GlobQuery, GlobResult, RequestStats};
pub use policy::{Decision, FindFailure, StatusPolicy, SuccessKind};
pub use resolver::{FindOutcome, HttpResolver, RequestContext, Resolver, REQUEST_ID_HEADER};
