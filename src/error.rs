//! Error taxonomy for the analytics pipeline.
//!
//! Only source-level failures travel upward. Malformed items are dropped in
//! the ingest loop, thin vocabularies produce an empty topic list, and
//! decomposition failures end up as a topic status on the dataset.

use thiserror::Error;

/// Failures of a single ingestion run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Transport failure, bad status or undecodable page from the upstream source.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    /// Source reachable but nothing usable inside the window.
    #[error("source returned no posts inside the window")]
    EmptyResult,
}

/// Failures of a full dataset build (ingest + analytics).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("source returned no posts inside the window")]
    EmptyResult,
    #[error("source did not answer within {0} seconds")]
    Timeout(u64),
    /// The analytics task panicked or was cancelled before handing back a dataset.
    #[error("dataset build aborted: {0}")]
    Aborted(String),
}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::SourceUnavailable(msg) => PipelineError::SourceUnavailable(msg),
            IngestError::EmptyResult => PipelineError::EmptyResult,
        }
    }
}

/// Numerical failures inside a topic model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecompositionError {
    /// Input carries no mass to factorize (all-zero matrix, no tokens).
    #[error("degenerate input: {0}")]
    Degenerate(String),
    /// Updates produced NaN or infinite values.
    #[error("model did not converge to finite values")]
    NonFinite,
}

/// What the cache hands back when it has nothing to serve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("tweet data unavailable: {0}")]
    Unavailable(#[source] PipelineError),
}
