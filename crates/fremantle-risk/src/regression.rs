//! Ordinary least squares with a single regressor
//!
//! Fits `y = a + b * x + e` (or `y = b * x + e` without an intercept) and
//! returns the residuals `e`, which are orthogonal to `x` by construction.

use fremantle_data::DataError;
use fremantle_factors::FactorError;
use ndarray::Array1;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during regression and orthogonalization
#[derive(Debug, Error)]
pub enum RegressionError {
    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A joined column holds a null
    #[error("Missing value in column {0}")]
    MissingValue(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Invalid transform settings
    #[error("Factor error: {0}")]
    Factor(#[from] FactorError),

    /// Factor table error
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Result of a single-regressor OLS fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    /// Intercept (zero when fitted without one)
    pub intercept: f64,
    /// Slope on the regressor
    pub slope: f64,
    /// `y - intercept - slope * x`
    pub residuals: Vec<f64>,
}

/// Regress `y` on `x`.
///
/// A regressor without variation gets a zero slope, leaving the residuals
/// equal to `y` (demeaned when an intercept is fitted).
pub fn ols(
    y: &Array1<f64>,
    x: &Array1<f64>,
    fit_intercept: bool,
) -> Result<OlsFit, RegressionError> {
    if y.len() != x.len() {
        return Err(RegressionError::DimensionMismatch {
            expected: y.len(),
            actual: x.len(),
        });
    }

    if y.is_empty() {
        return Ok(OlsFit {
            intercept: 0.0,
            slope: 0.0,
            residuals: Vec::new(),
        });
    }

    let (x_mean, y_mean) = if fit_intercept {
        (x.mean().unwrap_or(0.0), y.mean().unwrap_or(0.0))
    } else {
        (0.0, 0.0)
    };

    let xc = x.mapv(|v| v - x_mean);
    let yc = y.mapv(|v| v - y_mean);

    let sxx = xc.dot(&xc);
    let slope = if sxx > f64::EPSILON { xc.dot(&yc) / sxx } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    let residuals = y - &x.mapv(|v| intercept + slope * v);

    Ok(OlsFit {
        intercept,
        slope,
        residuals: residuals.to_vec(),
    })
}
