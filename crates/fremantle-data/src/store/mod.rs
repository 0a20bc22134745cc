//! Persistent storage for market data and factor tables.

pub mod sqlite;

pub use sqlite::{FactorNamespace, SqliteStore, StoreStats};
