//! Error types for the liquidity pipeline.

use fremantle_data::DataError;
use fremantle_factors::FactorError;
use fremantle_risk::RegressionError;
use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Per-security failures never surface here; they are recorded as
/// [`SkippedSecurity`](crate::report::SkippedSecurity) entries instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Calendar, reference data, size table or sink failure
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Invalid factor configuration
    #[error("Factor error: {0}")]
    Factor(#[from] FactorError),

    /// Orthogonalization failure
    #[error("Regression error: {0}")]
    Regression(#[from] RegressionError),

    /// The worker pool could not be started
    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Invalid pipeline configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
