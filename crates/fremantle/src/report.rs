//! Run diagnostics.

use chrono::NaiveDate;
use fremantle_data::SecurityId;
use fremantle_risk::JoinStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a security has no loading on an evaluation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The market-data provider returned nothing
    NoMarketData,
    /// A turnover sum could not be logged
    Computation(String),
    /// The task failed or panicked
    WorkerFailure(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMarketData => write!(f, "no market data"),
            Self::Computation(detail) => write!(f, "computation error: {detail}"),
            Self::WorkerFailure(detail) => write!(f, "worker failure: {detail}"),
        }
    }
}

/// A security left out of a cross-section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSecurity {
    /// Security id
    pub id: SecurityId,
    /// Reason it was skipped
    pub reason: SkipReason,
}

/// Diagnostics for one evaluation date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateReport {
    /// Date the metrics were computed for
    pub evaluation_date: NaiveDate,
    /// Date the loadings are published under
    pub date_label: NaiveDate,
    /// Eligible securities
    pub universe_size: usize,
    /// Securities with a raw loading
    pub computed: usize,
    /// Securities without a raw loading, sorted by id
    pub skipped: Vec<SkippedSecurity>,
    /// Inner join of raw liquidity with size
    pub join: JoinStats,
    /// Whether the tables were handed to the sinks
    pub persisted: bool,
}

impl DateReport {
    /// Skipped securities with the given reason kind.
    pub fn count_skipped(&self, matches: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| matches(&s.reason)).count()
    }
}

/// Diagnostics for a whole run, one report per processed date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Reports in processing order
    pub reports: Vec<DateReport>,
}

impl RunSummary {
    /// Number of processed dates.
    pub fn dates(&self) -> usize {
        self.reports.len()
    }

    /// Total skipped securities across all dates.
    pub fn total_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::NoMarketData.to_string(), "no market data");
        assert_eq!(
            SkipReason::WorkerFailure("boom".into()).to_string(),
            "worker failure: boom"
        );
    }

    #[test]
    fn test_skip_reason_serde() {
        let json = serde_json::to_string(&SkipReason::Computation("stom".into())).unwrap();
        assert_eq!(json, r#"{"reason":"computation","detail":"stom"}"#);
        let parsed: SkipReason = serde_json::from_str(r#"{"reason":"no_market_data"}"#).unwrap();
        assert_eq!(parsed, SkipReason::NoMarketData);
    }

    #[test]
    fn test_count_skipped() {
        let d = NaiveDate::from_ymd_opt(2018, 1, 2).unwrap();
        let report = DateReport {
            evaluation_date: d,
            date_label: d,
            universe_size: 3,
            computed: 1,
            skipped: vec![
                SkippedSecurity {
                    id: SecurityId::new("A"),
                    reason: SkipReason::NoMarketData,
                },
                SkippedSecurity {
                    id: SecurityId::new("B"),
                    reason: SkipReason::WorkerFailure("x".into()),
                },
            ],
            join: JoinStats::default(),
            persisted: false,
        };
        assert_eq!(
            report.count_skipped(|r| matches!(r, SkipReason::NoMarketData)),
            1
        );
    }
}
