//! Collaborator interfaces consumed by the factor pipeline.
//!
//! Every trait is `Send + Sync` so a single provider can be shared by the
//! workers of a parallel batch.

use crate::error::{DataError, Result};
use crate::types::{DailyMarketRecord, FactorTable, SecurityBasics, SecurityId};
use chrono::{Datelike, NaiveDate};

/// Source of trading dates.
pub trait TradingCalendar: Send + Sync {
    /// Trading days in `[start, end]`, ascending.
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// The last `n` trading days on or before `end`, ascending.
    fn trading_days_ending(&self, end: NaiveDate, n: usize) -> Result<Vec<NaiveDate>>;

    /// The first `n` trading days on or after `start`, ascending.
    fn trading_days_starting(&self, start: NaiveDate, n: usize) -> Result<Vec<NaiveDate>>;

    /// The trading day after `date`, used as the publication label.
    fn next_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.trading_days_starting(date, 2)?
            .get(1)
            .copied()
            .ok_or_else(|| DataError::Calendar(format!("no trading day after {date}")))
    }

    /// Whether `date` is the last trading day of its month.
    fn is_month_end(&self, date: NaiveDate) -> Result<bool> {
        let next = self.next_trading_day(date)?;
        Ok(next.month() != date.month() || next.year() != date.year())
    }
}

/// Source of the security reference table.
pub trait SecurityBasicsProvider: Send + Sync {
    /// Every security with its listing date.
    fn security_basics(&self) -> Result<Vec<SecurityBasics>>;
}

/// Source of unadjusted daily market data.
pub trait MarketDataProvider: Send + Sync {
    /// At most `ndays` records ending on or before `end`, oldest first.
    ///
    /// Returns an empty vector when the security has no data.
    fn daily_turnover(
        &self,
        id: &SecurityId,
        end: NaiveDate,
        ndays: usize,
    ) -> Result<Vec<DailyMarketRecord>>;
}

/// Reader for the size factor produced by another pipeline.
pub trait SizeFactorReader: Send + Sync {
    /// Size loadings stored for `evaluation_date`; empty when none were stored.
    fn size_factor(&self, evaluation_date: NaiveDate) -> Result<FactorTable>;
}

/// Destination for persisted factor tables.
pub trait FactorSink: Send + Sync {
    /// Persist `table` under `name`, replacing any table of the same name.
    fn persist(&self, name: &str, table: &FactorTable) -> Result<()>;
}
