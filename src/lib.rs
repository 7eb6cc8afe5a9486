//! chart-axis: render-independent time-axis and price-scale core.
//!
//! Merges the times of any number of series into one dense index space,
//! stores per-series rows with whitespace padding, thins time-axis labels
//! and maps values to pixels under every price-scale mode. [`ChartModel`]
//! is the single entry point that drives those pieces.

pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod telemetry;

pub use config::ChartModelConfig;
pub use error::{ChartError, ChartResult};
pub use model::ChartModel;
