//! SQLite store for calendar, reference data, turnover and factor tables.

use crate::dates::{compact, parse_date};
use crate::error::{DataError, Result};
use crate::provider::{
    FactorSink, MarketDataProvider, SecurityBasicsProvider, SizeFactorReader, TradingCalendar,
};
use crate::types::{DailyMarketRecord, FactorRow, FactorTable, SecurityBasics, SecurityId};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed store.
///
/// The connection sits behind a mutex so one store can serve the workers of a
/// parallel batch. Every query holds the lock until its rows are read, so
/// parallel workers reading turnover from one store take turns on the
/// connection; the pool overlaps the metric computation, not the reads.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DataError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trading_days (
                date TEXT PRIMARY KEY
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS security_basics (
                id TEXT PRIMARY KEY,
                list_date TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_turnover (
                id TEXT NOT NULL,
                date TEXT NOT NULL,
                turnover REAL NOT NULL,
                PRIMARY KEY (id, date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS factor_loadings (
                factor TEXT NOT NULL,
                table_name TEXT NOT NULL,
                date TEXT NOT NULL,
                id TEXT NOT NULL,
                factorvalue REAL NOT NULL,
                persisted_at TEXT NOT NULL,
                PRIMARY KEY (factor, table_name, id)
            )",
            [],
        )?;

        Ok(())
    }

    /// Add trading days to the calendar.
    pub fn put_trading_days(&self, days: &[NaiveDate]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        for day in days {
            tx.execute(
                "INSERT OR IGNORE INTO trading_days (date) VALUES (?1)",
                params![day.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace security reference records.
    pub fn put_security_basics(&self, basics: &[SecurityBasics]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        for b in basics {
            tx.execute(
                "INSERT OR REPLACE INTO security_basics (id, list_date) VALUES (?1, ?2)",
                params![b.id.as_str(), b.list_date.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace daily turnover records of one security.
    pub fn put_turnover(&self, id: &SecurityId, records: &[DailyMarketRecord]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        for r in records {
            tx.execute(
                "INSERT OR REPLACE INTO daily_turnover (id, date, turnover) VALUES (?1, ?2, ?3)",
                params![id.as_str(), r.date.to_string(), r.turnover],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Store a factor table, replacing any table with the same factor and name.
    pub fn put_factor_table(&self, factor: &str, name: &str, table: &FactorTable) -> Result<()> {
        let persisted_at = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM factor_loadings WHERE factor = ?1 AND table_name = ?2",
            params![factor, name],
        )?;

        for row in table {
            tx.execute(
                "INSERT INTO factor_loadings
                 (factor, table_name, date, id, factorvalue, persisted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    factor,
                    name,
                    row.date.to_string(),
                    row.id.as_str(),
                    row.factorvalue,
                    persisted_at
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Load a factor table; a table that was never stored is empty.
    pub fn get_factor_table(&self, factor: &str, name: &str) -> Result<FactorTable> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, id, factorvalue FROM factor_loadings
             WHERE factor = ?1 AND table_name = ?2
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![factor, name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (date, id, value) = row?;
            out.push(FactorRow::new(parse_date(&date)?, SecurityId::new(id), value));
        }

        FactorTable::new(out)
    }

    /// Names of the tables stored for a factor, sorted.
    pub fn factor_table_names(&self, factor: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT table_name FROM factor_loadings
             WHERE factor = ?1 ORDER BY table_name ASC",
        )?;
        let names = stmt
            .query_map(params![factor], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// View of the tables stored under one factor name.
    pub fn namespace(&self, factor: impl Into<String>) -> FactorNamespace<'_> {
        FactorNamespace {
            store: self,
            factor: factor.into(),
        }
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            trading_days: count("SELECT COUNT(*) FROM trading_days")?,
            securities: count("SELECT COUNT(*) FROM security_basics")?,
            turnover_records: count("SELECT COUNT(*) FROM daily_turnover")?,
            factor_tables: count(
                "SELECT COUNT(*) FROM (SELECT DISTINCT factor, table_name FROM factor_loadings)",
            )?,
            factor_rows: count("SELECT COUNT(*) FROM factor_loadings")?,
        })
    }

    fn query_dates(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<NaiveDate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter().map(|d| parse_date(d)).collect()
    }
}

impl TradingCalendar for SqliteStore {
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        self.query_dates(
            "SELECT date FROM trading_days WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
            params![start.to_string(), end.to_string()],
        )
    }

    fn trading_days_ending(&self, end: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
        let mut days = self.query_dates(
            "SELECT date FROM trading_days WHERE date <= ?1 ORDER BY date DESC LIMIT ?2",
            params![end.to_string(), n as i64],
        )?;
        days.reverse();
        Ok(days)
    }

    fn trading_days_starting(&self, start: NaiveDate, n: usize) -> Result<Vec<NaiveDate>> {
        self.query_dates(
            "SELECT date FROM trading_days WHERE date >= ?1 ORDER BY date ASC LIMIT ?2",
            params![start.to_string(), n as i64],
        )
    }
}

impl SecurityBasicsProvider for SqliteStore {
    fn security_basics(&self) -> Result<Vec<SecurityBasics>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, list_date FROM security_basics ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, list_date)| Ok(SecurityBasics::new(id, parse_date(&list_date)?)))
            .collect()
    }
}

impl MarketDataProvider for SqliteStore {
    fn daily_turnover(
        &self,
        id: &SecurityId,
        end: NaiveDate,
        ndays: usize,
    ) -> Result<Vec<DailyMarketRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, turnover FROM daily_turnover
             WHERE id = ?1 AND date <= ?2
             ORDER BY date DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![id.as_str(), end.to_string(), ndays as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = rows
            .into_iter()
            .map(|(date, turnover)| Ok(DailyMarketRecord::new(parse_date(&date)?, turnover)))
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }
}

/// The tables of one factor inside a [`SqliteStore`].
///
/// Reads as a size-factor source (tables named by the compact evaluation
/// date) and writes as a factor sink.
#[derive(Debug, Clone)]
pub struct FactorNamespace<'a> {
    store: &'a SqliteStore,
    factor: String,
}

impl FactorNamespace<'_> {
    /// Factor name of this namespace.
    pub fn factor(&self) -> &str {
        &self.factor
    }
}

impl SizeFactorReader for FactorNamespace<'_> {
    fn size_factor(&self, evaluation_date: NaiveDate) -> Result<FactorTable> {
        self.store
            .get_factor_table(&self.factor, &compact(evaluation_date))
    }
}

impl FactorSink for FactorNamespace<'_> {
    fn persist(&self, name: &str, table: &FactorTable) -> Result<()> {
        self.store.put_factor_table(&self.factor, name, table)
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of trading days in the calendar
    pub trading_days: usize,
    /// Number of securities in the reference table
    pub securities: usize,
    /// Number of daily turnover records
    pub turnover_records: usize,
    /// Number of stored factor tables
    pub factor_tables: usize,
    /// Number of stored factor rows
    pub factor_rows: usize,
}
