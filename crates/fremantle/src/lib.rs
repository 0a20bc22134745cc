#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod universe;

// Re-export main types from sub-crates
pub use fremantle_data as data;
pub use fremantle_factors as factors;
pub use fremantle_output as output;
pub use fremantle_risk as risk;

pub use aggregate::{CrossSection, aggregate};
pub use coordinator::{BatchOutcome, Coordinator, ExecutionMode, TaskOutcome};
pub use error::{PipelineError, Result};
pub use pipeline::{
    DateResult, LiquidityPipeline, PipelineConfig, RunRequest, Sources, table_names,
};
pub use report::{DateReport, RunSummary, SkipReason, SkippedSecurity};
pub use universe::{EligibleUniverse, Universe, select_universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
