#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dates;
pub mod error;
pub mod memory;
pub mod provider;
pub mod store;
pub mod types;

pub use error::{DataError, Result};
pub use memory::MemoryStore;
pub use provider::{
    FactorSink, MarketDataProvider, SecurityBasicsProvider, SizeFactorReader, TradingCalendar,
};
pub use store::{FactorNamespace, SqliteStore, StoreStats};
pub use types::{DailyMarketRecord, FactorRow, FactorTable, SecurityBasics, SecurityId};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
