//! Unit tests for the indicator evaluator

use chrono::{Duration, TimeZone, Utc};
use trendwatch::indicators::{evaluate, try_evaluate, IndicatorError};
use trendwatch::models::{Candle, DirectionalState, IndicatorSpec, Timeframe};

fn series(count: usize, step: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let price = 50.0 + i as f64 * step;
            Candle::new(price, price, price, price, 1.0, start + Duration::minutes(15 * i as i64))
        })
        .collect()
}

#[test]
fn test_evaluate_dispatches_on_kind() {
    let rising = series(120, 0.25);
    assert_eq!(
        evaluate(&rising, &IndicatorSpec::ema(21, Timeframe::M15)),
        DirectionalState::Bullish
    );

    let falling = series(120, -0.25);
    assert_eq!(
        evaluate(&falling, &IndicatorSpec::ema(50, Timeframe::M15)),
        DirectionalState::Bearish
    );
}

#[test]
fn test_evaluate_degrades_to_indeterminate() {
    let short = series(20, 0.25);
    let spec = IndicatorSpec::macd(12, 26, 9, Timeframe::M15);

    assert!(matches!(
        try_evaluate(&short, &spec),
        Err(IndicatorError::InsufficientData { .. })
    ));
    assert_eq!(evaluate(&short, &spec), DirectionalState::Indeterminate);
    assert_eq!(evaluate(&[], &spec), DirectionalState::Indeterminate);
}
