//! Trendwatch: multi-timeframe trend monitor with edge-triggered alerts.
//!
//! Indicators are recomputed at every candle close of their timeframe, folded
//! into one bullish/bearish/neutral verdict per asset, and a notification is
//! raised when an asset flips into a direction its subscription asks for.

pub mod alerts;
pub mod common;
pub mod config;
pub mod core;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod services;
pub mod signals;
pub mod store;
