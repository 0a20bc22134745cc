//! Robust cross-sectional transforms.
//!
//! A cross-section is clipped to a dispersion bound and then rescaled to zero
//! mean and unit variance before it enters a regression. The transforms are
//! polars expressions over one column; bounds and moments are column
//! aggregates broadcast back over the rows, so outputs keep the length and
//! order of their inputs.

use crate::error::FactorError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const VALUE: &str = "value";

/// How extreme values are bounded before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClipMethod {
    /// Clip to `median ± multiple * MAD`
    Mad {
        /// Number of median absolute deviations kept on each side
        multiple: f64,
    },
    /// Clip to the `lower` and `upper` quantiles (fractions in `[0, 1]`)
    Percentile {
        /// Lower quantile
        lower: f64,
        /// Upper quantile
        upper: f64,
    },
    /// Leave values untouched
    None,
}

impl Default for ClipMethod {
    fn default() -> Self {
        Self::Mad { multiple: 5.0 }
    }
}

/// Configuration for [`robust_transform`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustConfig {
    /// Clipping rule (default: median ± 5 MAD)
    pub clip: ClipMethod,
}

impl RobustConfig {
    /// Reject clipping bounds that cannot describe an interval.
    pub fn validate(&self) -> Result<(), FactorError> {
        match self.clip {
            ClipMethod::Mad { multiple } if !(multiple.is_finite() && multiple >= 0.0) => {
                Err(FactorError::InvalidConfig(format!(
                    "MAD multiple must be finite and non-negative, got {multiple}"
                )))
            }
            ClipMethod::Percentile { lower, upper }
                if !((0.0..=1.0).contains(&lower)
                    && (0.0..=1.0).contains(&upper)
                    && lower <= upper) =>
            {
                Err(FactorError::InvalidConfig(format!(
                    "percentile bounds must satisfy 0 <= lower <= upper <= 1, got lower={lower} upper={upper}"
                )))
            }
            _ => Ok(()),
        }
    }
}

fn abs_expr(x: Expr) -> Expr {
    when(x.clone().lt(lit(0.0)))
        .then(lit(0.0) - x.clone())
        .otherwise(x)
}

fn clip_expr(x: Expr, lower: Expr, upper: Expr) -> Expr {
    when(x.clone().lt(lower.clone()))
        .then(lower)
        .when(x.clone().gt(upper.clone()))
        .then(upper)
        .otherwise(x)
}

/// Pull values outside the clipping bound in to the bound.
pub fn winsorize_expr(x: Expr, method: ClipMethod) -> Expr {
    match method {
        ClipMethod::Mad { multiple } => {
            let median = x.clone().median();
            let mad = abs_expr(x.clone() - median.clone()).median();
            clip_expr(
                x,
                median.clone() - lit(multiple) * mad.clone(),
                median + lit(multiple) * mad,
            )
        }
        ClipMethod::Percentile { lower, upper } => clip_expr(
            x.clone(),
            x.clone().quantile(lit(lower), QuantileMethod::Linear),
            x.quantile(lit(upper), QuantileMethod::Linear),
        ),
        ClipMethod::None => x,
    }
}

/// Rescale to zero mean and unit population variance.
///
/// A cross-section without dispersion maps to all zeros.
pub fn normalize_expr(x: Expr) -> Expr {
    let std = x.clone().std(0);
    when(std.clone().gt(lit(f64::EPSILON)))
        .then((x.clone() - x.mean()) / std)
        .otherwise(lit(0.0))
}

/// Winsorize, then normalize.
pub fn robust_expr(x: Expr, config: &RobustConfig) -> Expr {
    normalize_expr(winsorize_expr(x, config.clip))
}

fn apply(values: &[f64], transform: impl FnOnce(Expr) -> Expr) -> Result<Vec<f64>, FactorError> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let df = DataFrame::new(vec![Series::new(VALUE.into(), values).into()])?;
    let out = df
        .lazy()
        .select([transform(col(VALUE)).alias(VALUE)])
        .collect()?;

    Ok(out
        .column(VALUE)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// [`winsorize_expr`] over a slice.
pub fn winsorize(values: &[f64], method: ClipMethod) -> Result<Vec<f64>, FactorError> {
    apply(values, |x| winsorize_expr(x, method))
}

/// [`normalize_expr`] over a slice.
pub fn normalize(values: &[f64]) -> Result<Vec<f64>, FactorError> {
    apply(values, normalize_expr)
}

/// [`robust_expr`] over a slice.
pub fn robust_transform(values: &[f64], config: &RobustConfig) -> Result<Vec<f64>, FactorError> {
    apply(values, |x| robust_expr(x, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_mad_clips_outlier() {
        // median 3, deviations [2, 1, 0, 1, 97] -> MAD 1, bounds [0, 6] at 3 MAD
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let clipped = winsorize(&values, ClipMethod::Mad { multiple: 3.0 }).unwrap();
        assert_eq!(clipped, vec![1.0, 2.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_mad_even_length_uses_midpoint_median() {
        // median 2.5, deviations [1.5, 0.5, 0.5, 47.5] -> MAD 1, bounds [0.5, 4.5]
        let values = [1.0, 2.0, 3.0, 50.0];
        let clipped = winsorize(&values, ClipMethod::Mad { multiple: 2.0 }).unwrap();
        assert_eq!(clipped, vec![1.0, 2.0, 3.0, 4.5]);
    }

    #[test]
    fn test_percentile_clips_both_tails() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let clipped = winsorize(
            &values,
            ClipMethod::Percentile {
                lower: 0.1,
                upper: 0.9,
            },
        )
        .unwrap();
        assert_relative_eq!(clipped[0], 1.0);
        assert_relative_eq!(clipped[10], 9.0);
        assert_relative_eq!(clipped[5], 5.0);
    }

    #[test]
    fn test_no_clip_is_identity() {
        let values = [1.0, -50.0, 1e9];
        assert_eq!(winsorize(&values, ClipMethod::None).unwrap(), values.to_vec());
    }

    #[test]
    fn test_normalize_moments() {
        let out = normalize(&[1.0, 2.0, 3.0, 4.0, 10.0]).unwrap();
        let n = out.len() as f64;
        let mean = out.iter().sum::<f64>() / n;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
        assert_relative_eq!(var, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_constant_and_single() {
        assert_eq!(normalize(&[2.5, 2.5, 2.5]).unwrap(), vec![0.0; 3]);
        assert_eq!(normalize(&[4.0]).unwrap(), vec![0.0]);
        assert!(normalize(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_robust_transform_preserves_order() {
        let values = [5.0, -1.0, 2.0, 1000.0];
        let out = robust_transform(&values, &RobustConfig::default()).unwrap();
        assert_eq!(out.len(), values.len());
        assert!(out[1] < out[2] && out[2] < out[0] && out[0] < out[3]);
    }

    #[rstest]
    #[case(ClipMethod::Mad { multiple: 0.0 })]
    #[case(ClipMethod::Mad { multiple: 5.0 })]
    #[case(ClipMethod::Percentile { lower: 0.0, upper: 1.0 })]
    #[case(ClipMethod::Percentile { lower: 0.5, upper: 0.5 })]
    #[case(ClipMethod::None)]
    fn test_validate_accepts(#[case] clip: ClipMethod) {
        assert!(RobustConfig { clip }.validate().is_ok());
    }

    #[rstest]
    #[case(ClipMethod::Mad { multiple: -1.0 })]
    #[case(ClipMethod::Mad { multiple: f64::NAN })]
    #[case(ClipMethod::Mad { multiple: f64::INFINITY })]
    #[case(ClipMethod::Percentile { lower: 0.9, upper: 0.1 })]
    #[case(ClipMethod::Percentile { lower: -0.1, upper: 0.9 })]
    #[case(ClipMethod::Percentile { lower: 0.1, upper: 1.5 })]
    #[case(ClipMethod::Percentile { lower: f64::NAN, upper: 0.9 })]
    fn test_validate_rejects(#[case] clip: ClipMethod) {
        let err = RobustConfig { clip }.validate().unwrap_err();
        assert!(matches!(err, FactorError::InvalidConfig(_)));
    }

    #[test]
    fn test_inverted_percentile_from_json_is_rejected() {
        let config: RobustConfig = serde_json::from_str(
            r#"{"clip":{"method":"percentile","lower":0.9,"upper":0.1}}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clip_method_serde() {
        let json = serde_json::to_string(&ClipMethod::Mad { multiple: 5.0 }).unwrap();
        assert_eq!(json, r#"{"method":"mad","multiple":5.0}"#);
        let parsed: ClipMethod =
            serde_json::from_str(r#"{"method":"percentile","lower":0.01,"upper":0.99}"#).unwrap();
        assert_eq!(
            parsed,
            ClipMethod::Percentile {
                lower: 0.01,
                upper: 0.99
            }
        );
    }
}
