//! Unit tests for the per-asset trend board

use chrono::{TimeZone, Utc};
use trendwatch::models::{Asset, DirectionalState, IndicatorSpec, Timeframe, Trend};
use trendwatch::signals::TrendBoard;

fn specs() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::ema(21, Timeframe::M15),
        IndicatorSpec::ema(50, Timeframe::H1),
    ]
}

#[test]
fn test_unevaluated_specs_count_as_indeterminate() {
    let asset = Asset::new("SUI/USDT:USDT").unwrap();
    let specs = specs();
    let mut board = TrendBoard::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();

    board.record(&asset, specs[0], DirectionalState::Bullish);
    assert_eq!(board.state(&asset, &specs[1]), DirectionalState::Indeterminate);
    assert_eq!(board.settle(&asset, &specs, now), Trend::Neutral);
}

#[test]
fn test_trend_aggregates_across_timeframes() {
    let asset = Asset::new("SUI/USDT:USDT").unwrap();
    let specs = specs();
    let mut board = TrendBoard::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();

    board.record(&asset, specs[1], DirectionalState::Bullish);
    board.settle(&asset, &specs, now);

    // A later 15m firing reuses the stored 1h state.
    board.record(&asset, specs[0], DirectionalState::Bullish);
    assert_eq!(board.settle(&asset, &specs, now), Trend::Bullish);

    board.record(&asset, specs[0], DirectionalState::Bearish);
    assert_eq!(board.settle(&asset, &specs, now), Trend::Neutral);
}

#[test]
fn test_settle_drops_unconfigured_specs() {
    let asset = Asset::new("TRX/USDT:USDT").unwrap();
    let specs = specs();
    let mut board = TrendBoard::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();

    board.record(&asset, specs[0], DirectionalState::Bearish);
    board.record(&asset, specs[1], DirectionalState::Bearish);
    assert_eq!(board.settle(&asset, &specs[..1], now), Trend::Bearish);
    assert_eq!(board.state(&asset, &specs[1]), DirectionalState::Indeterminate);
}

#[test]
fn test_snapshot_follows_roster_and_indicator_order() {
    let first = Asset::new("ADA/USDT:USDT").unwrap();
    let second = Asset::new("XRP/USDT:USDT").unwrap();
    let specs = specs();
    let mut board = TrendBoard::new();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();

    board.record(&second, specs[0], DirectionalState::Bullish);
    board.record(&second, specs[1], DirectionalState::Bullish);
    board.settle(&second, &specs, now);

    let rows = board.snapshot(&[first.clone(), second.clone()], &specs);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].asset, first);
    assert_eq!(rows[0].trend, Trend::Neutral);
    assert!(rows[0].updated_at.is_none());
    assert_eq!(rows[1].trend, Trend::Bullish);
    assert_eq!(rows[1].updated_at, Some(now));
    assert_eq!(rows[1].readings[0].indicator, "EMA21(15m)");
    assert_eq!(rows[1].readings[1].state, DirectionalState::Bullish);

    board.forget(&second);
    let rows = board.snapshot(&[second], &specs);
    assert_eq!(rows[0].trend, Trend::Neutral);
}
