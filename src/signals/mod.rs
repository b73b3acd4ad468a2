//! Trend aggregation and the per-asset state board.

pub mod aggregation;
pub mod engine;

pub use aggregation::aggregate;
pub use engine::{AssetTrend, IndicatorReading, TrendBoard};
