#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fremantle/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod orthogonal;
pub mod regression;

// Re-export main types
pub use orthogonal::{JoinStats, OrthogonalizeConfig, Orthogonalized, Orthogonalizer};
pub use regression::{OlsFit, RegressionError, ols};
