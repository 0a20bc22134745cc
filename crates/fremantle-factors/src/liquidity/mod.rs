//! Liquidity factor - log-scaled share turnover
//!
//! Less liquid securities tend to offer higher returns to compensate for
//! trading costs. The raw loading blends monthly, quarterly and annual
//! turnover: `0.35 * stom + 0.35 * stoq + 0.30 * stoa` by default.

pub mod calculator;
pub mod config;

pub use calculator::{LiquidityCalculator, LiquidityMetrics, RawMetricRow, compute_metrics};
pub use config::LiquidityConfig;
