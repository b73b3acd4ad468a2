//! Shared data models spanning the engine layers.

pub mod indicators;
pub mod signal;
pub mod timeframe;
pub mod watchlist;

pub use indicators::{Candle, EmaIndicator, IndicatorKind, IndicatorSpec, MacdIndicator};
pub use signal::{AlertSubscription, DirectionalState, Trend, TrendAlert};
pub use timeframe::Timeframe;
pub use watchlist::{Asset, Watchlist};
