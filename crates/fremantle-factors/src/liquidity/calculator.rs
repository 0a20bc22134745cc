//! Per-security liquidity metrics.
//!
//! For a trailing window of `stoa_months * stom_days` unadjusted turnover
//! ratios, oldest first:
//!
//! - `stom = ln(sum of the last stom_days turnovers)`
//! - `stoq = ln(sum of the last stom_days * stoq_months turnovers / stoq_months)`
//! - `stoa = ln(sum of the whole window / stoa_months)`
//!
//! A window shorter than required is summed in full. A sum that is not
//! strictly positive fails with [`FactorError::NonPositiveTurnover`] and the
//! security is left out of the cross-section.

use super::config::LiquidityConfig;
use crate::error::FactorError;
use chrono::NaiveDate;
use fremantle_data::{MarketDataProvider, SecurityId};
use serde::{Deserialize, Serialize};

/// Turnover metrics of one security on one evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    /// Log monthly turnover
    pub stom: f64,
    /// Log average monthly turnover over the quarter
    pub stoq: f64,
    /// Log average monthly turnover over the year
    pub stoa: f64,
    /// Weighted raw liquidity loading
    pub liquidity: f64,
}

/// Metrics of one security labelled for publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricRow {
    /// Trading day the loadings are published under
    pub date_label: NaiveDate,
    /// Security id
    pub id: SecurityId,
    /// Computed metrics
    pub metrics: LiquidityMetrics,
}

fn trailing_sum(values: &[f64], n: usize) -> f64 {
    values[values.len().saturating_sub(n)..].iter().sum()
}

fn checked_ln(window: &'static str, sum: f64, divisor: usize) -> Result<f64, FactorError> {
    if !sum.is_finite() || sum <= 0.0 {
        return Err(FactorError::NonPositiveTurnover { window, sum });
    }
    Ok((sum / divisor as f64).ln())
}

/// Compute the liquidity metrics of a turnover series, oldest first.
pub fn compute_metrics(
    turnover: &[f64],
    config: &LiquidityConfig,
) -> Result<LiquidityMetrics, FactorError> {
    let stom = checked_ln("stom", trailing_sum(turnover, config.stom_days), 1)?;
    let stoq = checked_ln(
        "stoq",
        trailing_sum(turnover, config.stoq_days()),
        config.stoq_months,
    )?;
    let stoa = checked_ln("stoa", turnover.iter().sum(), config.stoa_months)?;

    let liquidity =
        config.stom_weight * stom + config.stoq_weight * stoq + config.stoa_weight * stoa;

    Ok(LiquidityMetrics {
        stom,
        stoq,
        stoa,
        liquidity,
    })
}

/// Computes liquidity metrics for one security from its market data.
#[derive(Debug, Clone, Default)]
pub struct LiquidityCalculator {
    config: LiquidityConfig,
}

impl LiquidityCalculator {
    /// Create a calculator with the given configuration.
    pub const fn with_config(config: LiquidityConfig) -> Self {
        Self { config }
    }

    /// The calculator's configuration.
    pub const fn config(&self) -> &LiquidityConfig {
        &self.config
    }

    /// Factor name.
    pub const fn name(&self) -> &'static str {
        "liquidity"
    }

    /// Fetch the trailing window ending at `evaluation_date` and compute metrics.
    ///
    /// Returns `Ok(None)` when the provider has no data for the security.
    pub fn calculate(
        &self,
        market: &dyn MarketDataProvider,
        id: &SecurityId,
        evaluation_date: NaiveDate,
    ) -> Result<Option<LiquidityMetrics>, FactorError> {
        let records = market.daily_turnover(id, evaluation_date, self.config.window_days())?;
        if records.is_empty() {
            return Ok(None);
        }

        let turnover: Vec<f64> = records.iter().map(|r| r.turnover).collect();
        compute_metrics(&turnover, &self.config).map(Some)
    }
}
