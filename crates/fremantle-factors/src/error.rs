//! Error types for factor computation.

use fremantle_data::DataError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while computing factor loadings.
#[derive(Debug, Error)]
pub enum FactorError {
    /// A turnover sum that must be logged is zero, negative or not finite
    #[error("Non-positive {window} turnover sum {sum}: logarithm undefined")]
    NonPositiveTurnover {
        /// Metric whose window sum failed (`stom`, `stoq` or `stoa`)
        window: &'static str,
        /// Offending sum
        sum: f64,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Market data could not be read
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
