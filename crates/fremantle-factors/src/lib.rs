#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod liquidity;
pub mod robust;

pub use error::FactorError;
pub use liquidity::{LiquidityCalculator, LiquidityConfig, LiquidityMetrics, RawMetricRow};
pub use robust::{
    ClipMethod, RobustConfig, normalize, normalize_expr, robust_expr, robust_transform, winsorize,
    winsorize_expr,
};
