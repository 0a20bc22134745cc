//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Unparseable date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Trading calendar could not answer a query
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// A security appears twice in one factor table
    #[error("Duplicate security {id} in factor table")]
    DuplicateSecurity {
        /// The repeated security id
        id: String,
    },

    /// A factor table holds rows for more than one date label
    #[error("Factor table mixes date labels {first} and {other}")]
    MixedDateLabels {
        /// Date label of the first row
        first: String,
        /// Conflicting date label
        other: String,
    },

    /// A factor sink could not write a table
    #[error("Sink error: {0}")]
    Sink(String),

    /// A store mutex was poisoned by a panicking holder
    #[error("Store lock poisoned")]
    LockPoisoned,
}
