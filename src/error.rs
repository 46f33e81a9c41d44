//! Pipeline error taxonomy
//!
//! Stage failures carry a stable stage label so the job record can report
//! where processing stopped. AI-related failures never appear here; they are
//! converted to job warnings at the call site.

use thiserror::Error;

/// Errors that terminate a research job or reject a request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Unreachable(String),

    #[error("no seed keywords could be generated")]
    NoSeeds,

    #[error("metrics provider returned no keywords")]
    NoMetrics,

    #[error("clustering produced no clusters")]
    ClusterEmpty,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// The stage label recorded on the failed job.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "validating",
            PipelineError::RateLimited { .. } => "validating",
            PipelineError::NotFound => "validating",
            PipelineError::Unreachable(_) => "scanning",
            PipelineError::NoSeeds => "extracting",
            PipelineError::NoMetrics => "enriching",
            PipelineError::ClusterEmpty => "clustering",
            PipelineError::Internal(_) => "processing",
        }
    }

    /// The stable message presented to API consumers. Internal detail is
    /// kept out of the user-facing string.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}
