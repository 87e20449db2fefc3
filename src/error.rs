//! Error types shared across the pipeline.
//!
//! Listing failures are fatal for a run. Fetch and parse failures are scoped to
//! a single object: the coordinator records them and keeps going.

use crate::store::ObjectRef;
use crate::utils::parallel::RunReport;
use thiserror::Error;

/// Boxed source error from a store backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The store refused to enumerate a namespace/prefix.
#[derive(Debug, Error)]
#[error("failed to list objects in '{namespace}' under prefix '{prefix}': {source}")]
pub struct ListingError {
    pub namespace: String,
    pub prefix: String,
    #[source]
    pub source: BoxError,
}

impl ListingError {
    pub fn new(namespace: &str, prefix: &str, source: impl Into<BoxError>) -> Self {
        Self {
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
            source: source.into(),
        }
    }
}

/// Retrieving a single object failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("access denied: {key}")]
    AccessDenied { key: String },

    #[error("transport failure fetching {key}: {message}")]
    Transport { key: String, message: String },
}

/// A fetched document could not be decoded into CloudTrail records.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to decompress document: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("malformed JSON document: {0}")]
    Json(#[source] serde_json::Error),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json surfaces reader failures (bad gzip stream, truncated body) as io errors
        if err.is_io() {
            Self::Decompress(std::io::Error::from(err))
        } else {
            Self::Json(err)
        }
    }
}

/// Why one object contributed nothing to the index.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A per-object failure, keyed by the object it happened on.
#[derive(Debug)]
pub struct ObjectFailure {
    pub object: ObjectRef,
    pub error: ObjectError,
}

/// Run-level failures of the pipeline coordinator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{failed} objects failed, exceeding the tolerance of {tolerance}")]
    ToleranceExceeded {
        failed: usize,
        tolerance: usize,
        report: Box<RunReport>,
    },
}
