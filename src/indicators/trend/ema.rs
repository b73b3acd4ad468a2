//! EMA (Exponential Moving Average) indicator

use crate::common::math;
use crate::indicators::error::IndicatorError;
use crate::models::indicators::{Candle, EmaIndicator};
use crate::models::signal::DirectionalState;

/// Extra closed candles required beyond the period so the seed has washed out.
/// The bound is inclusive: `period + EMA_WARMUP_MARGIN` candles are enough,
/// one fewer is not.
pub const EMA_WARMUP_MARGIN: usize = 10;

pub fn ema_min_candles(period: u32) -> usize {
    period as usize + EMA_WARMUP_MARGIN
}

/// Calculate EMA of closing prices for a specific period
pub fn calculate_ema(candles: &[Candle], period: u32) -> Option<EmaIndicator> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let value = math::ema(&closes, period as usize)?;

    Some(EmaIndicator { value, period })
}

/// Bullish while the latest close sits above the EMA, bearish otherwise.
pub fn ema_state(candles: &[Candle], period: u32) -> Result<DirectionalState, IndicatorError> {
    let required = ema_min_candles(period);
    if candles.len() < required {
        return Err(IndicatorError::InsufficientData {
            required,
            available: candles.len(),
        });
    }

    let ema = calculate_ema(candles, period).ok_or(IndicatorError::Undefined)?;
    let close = candles.last().map(|c| c.close).ok_or(IndicatorError::Undefined)?;
    if !ema.value.is_finite() || !close.is_finite() {
        return Err(IndicatorError::Undefined);
    }

    if close > ema.value {
        Ok(DirectionalState::Bullish)
    } else {
        Ok(DirectionalState::Bearish)
    }
}
