#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod sink;

pub use export::{ExportError, ExportFormat, Exporter, read_factor_csv, read_factor_csv_file};
pub use sink::CsvDirectorySink;
