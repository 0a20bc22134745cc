//! Cross-sectional aggregation of per-security metrics.

use fremantle_data::{FactorRow, FactorTable, Result};
use fremantle_factors::{LiquidityMetrics, RawMetricRow};

/// The four raw tables of one evaluation date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossSection {
    /// Log monthly turnover
    pub stom: FactorTable,
    /// Log quarterly turnover
    pub stoq: FactorTable,
    /// Log annual turnover
    pub stoa: FactorTable,
    /// Weighted raw liquidity
    pub raw_liquidity: FactorTable,
}

fn project(rows: &[RawMetricRow], metric: impl Fn(&LiquidityMetrics) -> f64) -> Result<FactorTable> {
    FactorTable::new(
        rows.iter()
            .map(|r| FactorRow::new(r.date_label, r.id.clone(), metric(&r.metrics)))
            .collect(),
    )
}

/// Group raw metric rows into one table per metric.
///
/// Rows may arrive in any order. Fails on a duplicate security or when the
/// rows carry different date labels.
pub fn aggregate(rows: &[RawMetricRow]) -> Result<CrossSection> {
    Ok(CrossSection {
        stom: project(rows, |m| m.stom)?,
        stoq: project(rows, |m| m.stoq)?,
        stoa: project(rows, |m| m.stoa)?,
        raw_liquidity: project(rows, |m| m.liquidity)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fremantle_data::{DataError, SecurityId};

    fn label() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 2).unwrap()
    }

    fn row(id: &str, base: f64) -> RawMetricRow {
        RawMetricRow {
            date_label: label(),
            id: SecurityId::new(id),
            metrics: LiquidityMetrics {
                stom: base,
                stoq: base + 1.0,
                stoa: base + 2.0,
                liquidity: base + 3.0,
            },
        }
    }

    #[test]
    fn test_projection_is_order_independent() {
        let forward = aggregate(&[row("A", 0.0), row("B", 10.0)]).unwrap();
        let reverse = aggregate(&[row("B", 10.0), row("A", 0.0)]).unwrap();
        assert_eq!(forward, reverse);

        assert_eq!(forward.stom.get(&SecurityId::new("B")), Some(10.0));
        assert_eq!(forward.stoq.get(&SecurityId::new("B")), Some(11.0));
        assert_eq!(forward.stoa.get(&SecurityId::new("A")), Some(2.0));
        assert_eq!(forward.raw_liquidity.get(&SecurityId::new("A")), Some(3.0));
        assert_eq!(forward.raw_liquidity.date_label(), Some(label()));
    }

    #[test]
    fn test_empty_rows_give_empty_tables() {
        let tables = aggregate(&[]).unwrap();
        assert!(tables.stom.is_empty() && tables.raw_liquidity.is_empty());
    }

    #[test]
    fn test_duplicate_security_rejected() {
        let result = aggregate(&[row("A", 0.0), row("A", 1.0)]);
        assert!(matches!(result, Err(DataError::DuplicateSecurity { .. })));
    }
}
