//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;
use crate::indicators::error::IndicatorError;
use crate::models::indicators::{Candle, MacdIndicator};
use crate::models::signal::DirectionalState;

pub const MACD_WARMUP_MARGIN: usize = 10;

pub fn macd_min_candles(slow_period: u32, signal_period: u32) -> usize {
    slow_period as usize + signal_period as usize + MACD_WARMUP_MARGIN
}

/// Calculate MACD indicator
///
/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD
/// Histogram = MACD - Signal
pub fn calculate_macd(
    candles: &[Candle],
    fast_period: u32,
    slow_period: u32,
    signal_period: u32,
) -> Option<MacdIndicator> {
    if fast_period >= slow_period {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = math::ema_series(&closes, fast_period as usize)?;
    let slow = math::ema_series(&closes, slow_period as usize)?;

    // The fast series starts earlier; drop its head so both end on the same candle.
    let offset = fast.len() - slow.len();
    let macd_values: Vec<f64> = fast[offset..]
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = math::ema(&macd_values, signal_period as usize)?;
    let macd_line = *macd_values.last()?;

    Some(MacdIndicator {
        macd: macd_line,
        signal: signal_line,
        histogram: macd_line - signal_line,
        period: Some((fast_period, slow_period, signal_period)),
    })
}

/// Calculate MACD with default periods (12, 26, 9)
pub fn calculate_macd_default(candles: &[Candle]) -> Option<MacdIndicator> {
    calculate_macd(candles, 12, 26, 9)
}

/// Bullish while the MACD line is above its signal line, bearish otherwise.
pub fn macd_state(
    candles: &[Candle],
    fast_period: u32,
    slow_period: u32,
    signal_period: u32,
) -> Result<DirectionalState, IndicatorError> {
    let required = macd_min_candles(slow_period, signal_period);
    if candles.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            available: candles.len(),
        });
    }

    let macd = calculate_macd(candles, fast_period, slow_period, signal_period)
        .ok_or(IndicatorError::Undefined)?;
    if !macd.macd.is_finite() || !macd.signal.is_finite() {
        return Err(IndicatorError::Undefined);
    }

    if macd.macd > macd.signal {
        Ok(DirectionalState::Bullish)
    } else {
        Ok(DirectionalState::Bearish)
    }
}
