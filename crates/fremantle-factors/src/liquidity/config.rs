//! Configuration for the liquidity factor.

use crate::error::FactorError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for the liquidity factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Trading days in one month of turnover (default: 21)
    pub stom_days: usize,
    /// Months in the quarterly window (default: 3)
    pub stoq_months: usize,
    /// Months in the annual window (default: 12)
    pub stoa_months: usize,
    /// Weight of `stom` in the raw loading (default: 0.35)
    pub stom_weight: f64,
    /// Weight of `stoq` in the raw loading (default: 0.35)
    pub stoq_weight: f64,
    /// Weight of `stoa` in the raw loading (default: 0.30)
    pub stoa_weight: f64,
    /// Minimum calendar days since listing for a security to be eligible (default: 180)
    pub listed_days: i64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            stom_days: 21,
            stoq_months: 3,
            stoa_months: 12,
            stom_weight: 0.35,
            stoq_weight: 0.35,
            stoa_weight: 0.30,
            listed_days: 180,
        }
    }
}

impl LiquidityConfig {
    /// Length of the quarterly window in trading days.
    pub const fn stoq_days(&self) -> usize {
        self.stom_days * self.stoq_months
    }

    /// Length of the fetched market-data window in trading days.
    pub const fn window_days(&self) -> usize {
        self.stom_days * self.stoa_months
    }

    /// Reject window settings the calculator cannot use.
    ///
    /// Weights that do not sum to one are accepted with a warning.
    pub fn validate(&self) -> Result<(), FactorError> {
        if self.stom_days == 0 || self.stoq_months == 0 || self.stoa_months == 0 {
            return Err(FactorError::InvalidConfig(format!(
                "window lengths must be positive (stom_days={}, stoq_months={}, stoa_months={})",
                self.stom_days, self.stoq_months, self.stoa_months
            )));
        }
        if self.listed_days < 0 {
            return Err(FactorError::InvalidConfig(format!(
                "listed_days must not be negative, got {}",
                self.listed_days
            )));
        }

        let total = self.stom_weight + self.stoq_weight + self.stoa_weight;
        if (total - 1.0).abs() > 1e-9 {
            warn!(total, "liquidity weights do not sum to one");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LiquidityConfig::default();
        assert_eq!(config.stom_days, 21);
        assert_eq!(config.stoq_months, 3);
        assert_eq!(config.stoa_months, 12);
        assert_eq!(config.stom_weight, 0.35);
        assert_eq!(config.stoq_weight, 0.35);
        assert_eq!(config.stoa_weight, 0.30);
        assert_eq!(config.listed_days, 180);
    }

    #[test]
    fn test_window_lengths() {
        let config = LiquidityConfig::default();
        assert_eq!(config.stoq_days(), 63);
        assert_eq!(config.window_days(), 252);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = LiquidityConfig {
            stom_days: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FactorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_accepts_unnormalized_weights() {
        let config = LiquidityConfig {
            stoa_weight: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LiquidityConfig = serde_json::from_str(r#"{"stom_days": 20}"#).unwrap();
        assert_eq!(config.stom_days, 20);
        assert_eq!(config.stoa_months, 12);
    }
}
