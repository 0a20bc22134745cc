//! In-memory implementation of every collaborator.

use crate::error::{DataError, Result};
use crate::provider::{
    FactorSink, MarketDataProvider, SecurityBasicsProvider, SizeFactorReader, TradingCalendar,
};
use crate::types::{DailyMarketRecord, FactorTable, SecurityBasics, SecurityId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory data store.
///
/// Built once with the `with_*` methods and then shared read-only, except for
/// the tables it receives as a [`FactorSink`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    calendar: Vec<NaiveDate>,
    basics: Vec<SecurityBasics>,
    turnover: HashMap<SecurityId, Vec<DailyMarketRecord>>,
    size: HashMap<NaiveDate, FactorTable>,
    persisted: Mutex<BTreeMap<String, FactorTable>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add trading days to the calendar.
    pub fn with_trading_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.calendar.extend(days);
        self.calendar.sort_unstable();
        self.calendar.dedup();
        self
    }

    /// Add a security to the reference table.
    pub fn with_security(mut self, basics: SecurityBasics) -> Self {
        self.basics.push(basics);
        self
    }

    /// Set the daily turnover history of a security.
    pub fn with_turnover(mut self, id: SecurityId, mut records: Vec<DailyMarketRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        self.turnover.insert(id, records);
        self
    }

    /// Set the size table stored for an evaluation date.
    pub fn with_size_table(mut self, evaluation_date: NaiveDate, table: FactorTable) -> Self {
        self.size.insert(evaluation_date, table);
        self
    }

    /// A persisted table by name.
    pub fn persisted(&self, name: &str) -> Result<Option<FactorTable>> {
        let tables = self.persisted.lock().map_err(|_| DataError::LockPoisoned)?;
        Ok(tables.get(name).cloned())
    }

    /// Names of every persisted table, sorted.
    pub fn persisted_names(&self) -> Result<Vec<String>> {
        let tables = self.persisted.lock().map_err(|_| DataError::LockPoisoned)?;
        Ok(tables.keys().cloned().collect())
    }
}

impl TradingCalendar for MemoryStore {
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(self
            .calendar
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect())
    }

    fn trading_days_ending(&self, end: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
        let upto = self.calendar.partition_point(|d| *d <= end);
        let from = upto.saturating_sub(n);
        Ok(self.calendar[from..upto].to_vec())
    }

    fn trading_days_starting(&self, start: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
        let from = self.calendar.partition_point(|d| *d < start);
        Ok(self.calendar[from..].iter().take(n).copied().collect())
    }
}

impl SecurityBasicsProvider for MemoryStore {
    fn security_basics(&self) -> Result<Vec<SecurityBasics>> {
        Ok(self.basics.clone())
    }
}

impl MarketDataProvider for MemoryStore {
    fn daily_turnover(
        &self,
        id: &SecurityId,
        end: NaiveDate,
        ndays: usize,
    ) -> Result<Vec<DailyMarketRecord>> {
        let Some(records) = self.turnover.get(id) else {
            return Ok(Vec::new());
        };
        let upto = records.partition_point(|r| r.date <= end);
        let from = upto.saturating_sub(ndays);
        Ok(records[from..upto].to_vec())
    }
}

impl SizeFactorReader for MemoryStore {
    fn size_factor(&self, evaluation_date: NaiveDate) -> Result<FactorTable> {
        Ok(self.size.get(&evaluation_date).cloned().unwrap_or_default())
    }
}

impl FactorSink for MemoryStore {
    fn persist(&self, name: &str, table: &FactorTable) -> Result<()> {
        let mut tables = self.persisted.lock().map_err(|_| DataError::LockPoisoned)?;
        tables.insert(name.to_string(), table.clone());
        Ok(())
    }
}
