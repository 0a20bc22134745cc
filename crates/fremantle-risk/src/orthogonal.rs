//! Factor orthogonalization
//!
//! Removes the part of a factor explained by a reference factor:
//!
//! 1. inner-join both cross-sections on security id
//! 2. drop rows where either value is NaN or infinite
//! 3. winsorize and normalize each joined column
//! 4. regress the factor on the reference factor
//! 5. keep the residuals as the new loadings
//!
//! Securities missing from either table are dropped, so the output never
//! holds more securities than the smaller input.

use crate::regression::{OlsFit, RegressionError, ols};
use fremantle_data::{FactorTable, SecurityId};
use fremantle_factors::{RobustConfig, robust_expr};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for the Orthogonalizer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthogonalizeConfig {
    /// Transform applied to both joined columns before the fit
    pub robust: RobustConfig,
    /// Fit an intercept (default: false)
    pub fit_intercept: bool,
}

/// How the inner join changed the cross-section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinStats {
    /// Securities present in both tables with finite values
    pub joined: usize,
    /// Securities dropped because the reference table lacks them
    pub factor_only: usize,
    /// Reference securities without a factor loading
    pub reference_only: usize,
    /// Matched securities dropped for a non-finite value on either side
    pub non_finite: usize,
}

/// Output of [`Orthogonalizer::orthogonalize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Orthogonalized {
    /// Residual loadings under the factor table's date label
    pub table: FactorTable,
    /// Join diagnostics
    pub stats: JoinStats,
    /// Intercept of the fit
    pub intercept: f64,
    /// Slope on the reference factor
    pub slope: f64,
}

/// Residualizes a factor against a reference factor
#[derive(Debug, Clone, Default)]
pub struct Orthogonalizer {
    config: OrthogonalizeConfig,
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, RegressionError> {
    df.column(name)?
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| RegressionError::MissingValue(name.to_string())))
        .collect()
}

impl Orthogonalizer {
    /// Create an orthogonalizer with the given configuration.
    pub const fn with_config(config: OrthogonalizeConfig) -> Self {
        Self { config }
    }

    /// The orthogonalizer's configuration.
    pub const fn config(&self) -> &OrthogonalizeConfig {
        &self.config
    }

    /// Inner-join `factor` with `reference` on security id.
    ///
    /// Returns a DataFrame with columns `id`, `factor`, `reference`, sorted by id.
    pub fn join(
        &self,
        factor: &FactorTable,
        reference: &FactorTable,
    ) -> Result<DataFrame, RegressionError> {
        let left = factor
            .to_dataframe()?
            .lazy()
            .select([col("id"), col("factorvalue").alias("factor")]);
        let right = reference
            .to_dataframe()?
            .lazy()
            .select([col("id"), col("factorvalue").alias("reference")]);

        let joined = left
            .join(
                right,
                [col("id")],
                [col("id")],
                JoinArgs::new(JoinType::Inner),
            )
            .sort(["id"], Default::default())
            .collect()?;

        Ok(joined)
    }

    /// Residualize `factor` against `reference`.
    pub fn orthogonalize(
        &self,
        factor: &FactorTable,
        reference: &FactorTable,
    ) -> Result<Orthogonalized, RegressionError> {
        self.config.robust.validate()?;

        let joined = self.join(factor, reference)?;
        let matched = joined.height();
        let finite = joined
            .lazy()
            .filter(col("factor").is_finite().and(col("reference").is_finite()))
            .collect()?;
        let n = finite.height();

        let stats = JoinStats {
            joined: n,
            factor_only: factor.len() - matched,
            reference_only: reference.len() - matched,
            non_finite: matched - n,
        };
        if stats.non_finite > 0 {
            warn!(
                dropped = stats.non_finite,
                "dropped securities with non-finite loadings before orthogonalization"
            );
        }

        let Some(date) = factor.date_label().filter(|_| n > 0) else {
            return Ok(Orthogonalized {
                table: FactorTable::empty(),
                stats,
                intercept: 0.0,
                slope: 0.0,
            });
        };

        let transformed = finite
            .lazy()
            .with_columns([
                robust_expr(col("factor"), &self.config.robust).alias("factor"),
                robust_expr(col("reference"), &self.config.robust).alias("reference"),
            ])
            .collect()?;

        let ids = transformed.column("id")?.str()?;
        let ids = ids
            .into_iter()
            .map(|v| {
                v.map(SecurityId::new)
                    .ok_or_else(|| RegressionError::MissingValue("id".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let y = Array1::from(f64_column(&transformed, "factor")?);
        let x = Array1::from(f64_column(&transformed, "reference")?);

        let OlsFit {
            intercept,
            slope,
            residuals,
        } = ols(&y, &x, self.config.fit_intercept)?;
        debug!(joined = n, slope, intercept, "orthogonalized cross-section");

        let table = FactorTable::from_values(date, ids.into_iter().zip(residuals))?;

        Ok(Orthogonalized {
            table,
            stats,
            intercept,
            slope,
        })
    }
}
