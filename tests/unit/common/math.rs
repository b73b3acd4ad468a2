//! Unit tests for moving-average helpers

use trendwatch::common::math::{ema, ema_alpha, ema_from_previous, ema_series, sma};

#[test]
fn test_sma_uses_last_window() {
    let values = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(sma(&values, 2), Some(3.5));
    assert_eq!(sma(&values, 4), Some(2.5));
}

#[test]
fn test_sma_rejects_short_input_and_zero_period() {
    assert_eq!(sma(&[1.0, 2.0], 3), None);
    assert_eq!(sma(&[1.0, 2.0], 0), None);
}

#[test]
fn test_ema_alpha() {
    assert!((ema_alpha(9) - 0.2).abs() < 1e-12);
    assert!((ema_alpha(1) - 1.0).abs() < 1e-12);
}

#[test]
fn test_ema_series_is_seeded_with_sma() {
    // period 3: seed = (1 + 2 + 3) / 3 = 2, alpha = 0.5
    let series = ema_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
    assert_eq!(series.len(), 3);
    assert!((series[0] - 2.0).abs() < 1e-12);
    assert!((series[1] - 3.0).abs() < 1e-12);
    assert!((series[2] - 4.0).abs() < 1e-12);
}

#[test]
fn test_ema_matches_last_series_point() {
    let values: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin()).collect();
    let series = ema_series(&values, 10).unwrap();
    assert_eq!(series.len(), values.len() - 10 + 1);
    assert_eq!(ema(&values, 10), series.last().copied());
}

#[test]
fn test_ema_from_previous_step() {
    let next = ema_from_previous(10.0, 4.0, 3);
    assert!((next - 7.0).abs() < 1e-12);
}

#[test]
fn test_ema_insufficient_data() {
    assert!(ema_series(&[1.0, 2.0], 3).is_none());
    assert!(ema(&[], 1).is_none());
}
