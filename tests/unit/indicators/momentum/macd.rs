//! Unit tests for MACD indicator

use chrono::{Duration, TimeZone, Utc};
use trendwatch::indicators::momentum::{
    calculate_macd, calculate_macd_default, macd_min_candles, macd_state,
};
use trendwatch::indicators::IndicatorError;
use trendwatch::models::indicators::Candle;
use trendwatch::models::DirectionalState;

fn create_test_candles(closes: impl IntoIterator<Item = f64>) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, price)| {
            Candle::new(
                price,
                price + 0.1,
                price - 0.1,
                price,
                500.0,
                start + Duration::hours(i as i64),
            )
        })
        .collect()
}

/// Accelerating rally: the MACD line keeps rising above its signal.
fn accelerating_up(count: usize) -> Vec<Candle> {
    create_test_candles((0..count).map(|i| 100.0 + 0.01 * (i * i) as f64))
}

fn accelerating_down(count: usize) -> Vec<Candle> {
    create_test_candles((0..count).map(|i| 200.0 - 0.01 * (i * i) as f64))
}

#[test]
fn test_macd_default_periods() {
    let candles = accelerating_up(80);
    let macd = calculate_macd_default(&candles).unwrap();
    assert_eq!(macd.period, Some((12, 26, 9)));
    assert!((macd.histogram - (macd.macd - macd.signal)).abs() < 1e-12);
}

#[test]
fn test_macd_rejects_fast_not_below_slow() {
    let candles = accelerating_up(80);
    assert!(calculate_macd(&candles, 26, 12, 9).is_none());
    assert!(calculate_macd(&candles, 12, 12, 9).is_none());
}

#[test]
fn test_macd_insufficient_data() {
    let candles = accelerating_up(30);
    assert!(calculate_macd(&candles, 12, 26, 9).is_none());
}

#[test]
fn test_macd_min_candles() {
    assert_eq!(macd_min_candles(26, 9), 45);
}

#[test]
fn test_macd_state_bullish_on_acceleration() {
    let candles = accelerating_up(80);
    assert_eq!(
        macd_state(&candles, 12, 26, 9).unwrap(),
        DirectionalState::Bullish
    );
}

#[test]
fn test_macd_state_bearish_on_selloff() {
    let candles = accelerating_down(80);
    assert_eq!(
        macd_state(&candles, 12, 26, 9).unwrap(),
        DirectionalState::Bearish
    );
}

#[test]
fn test_macd_state_requires_lookback() {
    let candles = accelerating_up(44);
    assert!(matches!(
        macd_state(&candles, 12, 26, 9),
        Err(IndicatorError::InsufficientData {
            required: 45,
            available: 44
        })
    ));
}
