//! CSV import into the SQLite store.
//!
//! Expected headers:
//! - calendar: `date`
//! - basics: `id,list_date`
//! - turnover: `id,date,turnover`
//! - size: `date,id,factorvalue`

use chrono::NaiveDate;
use clap::ValueEnum;
use fremantle_data::dates::{compact, parse_date};
use fremantle_data::{
    DailyMarketRecord, DataError, FactorSink, SecurityBasics, SecurityId, SqliteStore,
};
use fremantle_output::{ExportError, read_factor_csv};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;
use tracing::info;

/// Kind of data held by an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ImportKind {
    /// Trading calendar
    Calendar,
    /// Security reference table
    Basics,
    /// Daily turnover ratios
    Turnover,
    /// Size factor loadings for one evaluation date
    Size,
}

/// Errors that can occur during import.
#[derive(Debug, Error)]
pub(crate) enum ImportError {
    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Store error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Factor table parsing error
    #[error("Factor table error: {0}")]
    Export(#[from] ExportError),

    /// Size import without an evaluation date
    #[error("Size import needs --date <evaluation date>")]
    MissingDate,
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    date: String,
}

#[derive(Debug, Deserialize)]
struct BasicsRow {
    id: String,
    list_date: String,
}

#[derive(Debug, Deserialize)]
struct TurnoverRow {
    id: String,
    date: String,
    turnover: f64,
}

/// Import `reader` into `store`, returning the number of rows read.
pub(crate) fn import<R: Read>(
    store: &SqliteStore,
    kind: ImportKind,
    reader: R,
    size_factor: &str,
    evaluation_date: Option<NaiveDate>,
) -> Result<usize, ImportError> {
    let count = match kind {
        ImportKind::Calendar => import_calendar(store, reader)?,
        ImportKind::Basics => import_basics(store, reader)?,
        ImportKind::Turnover => import_turnover(store, reader)?,
        ImportKind::Size => {
            let date = evaluation_date.ok_or(ImportError::MissingDate)?;
            let table = read_factor_csv(reader)?;
            store.namespace(size_factor).persist(&compact(date), &table)?;
            table.len()
        }
    };
    info!(?kind, rows = count, "import complete");
    Ok(count)
}

fn import_calendar<R: Read>(store: &SqliteStore, reader: R) -> Result<usize, ImportError> {
    let mut days = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let CalendarRow { date } = row?;
        days.push(parse_date(&date)?);
    }
    store.put_trading_days(&days)?;
    Ok(days.len())
}

fn import_basics<R: Read>(store: &SqliteStore, reader: R) -> Result<usize, ImportError> {
    let mut basics = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize() {
        let BasicsRow { id, list_date } = row?;
        basics.push(SecurityBasics::new(SecurityId::new(id), parse_date(&list_date)?));
    }
    store.put_security_basics(&basics)?;
    Ok(basics.len())
}

fn import_turnover<R: Read>(store: &SqliteStore, reader: R) -> Result<usize, ImportError> {
    let mut by_id: BTreeMap<SecurityId, Vec<DailyMarketRecord>> = BTreeMap::new();
    let mut count = 0;
    for row in csv::Reader::from_reader(reader).deserialize() {
        let TurnoverRow { id, date, turnover } = row?;
        by_id
            .entry(SecurityId::new(id))
            .or_default()
            .push(DailyMarketRecord::new(parse_date(&date)?, turnover));
        count += 1;
    }
    for (id, records) in &by_id {
        store.put_turnover(id, records)?;
    }
    Ok(count)
}
