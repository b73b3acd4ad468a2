//! Maps a closed candle series and an indicator spec to a directional state.
//!
//! Every indicator reads the latest candle of the series it is given. The
//! fetcher has already removed any candle that was still open, so "latest"
//! always means the most recent *closed* candle.

use tracing::debug;

use crate::indicators::error::IndicatorError;
use crate::indicators::momentum::macd_state;
use crate::indicators::trend::ema_state;
use crate::models::indicators::{Candle, IndicatorKind, IndicatorSpec};
use crate::models::signal::DirectionalState;

pub fn try_evaluate(
    series: &[Candle],
    spec: &IndicatorSpec,
) -> Result<DirectionalState, IndicatorError> {
    match spec.kind {
        IndicatorKind::Ema { period } => ema_state(series, period),
        IndicatorKind::Macd { fast, slow, signal } => macd_state(series, fast, slow, signal),
    }
}

/// Like [`try_evaluate`], but any failure degrades to `Indeterminate`.
pub fn evaluate(series: &[Candle], spec: &IndicatorSpec) -> DirectionalState {
    match try_evaluate(series, spec) {
        Ok(state) => state,
        Err(e) => {
            debug!(
                indicator = %spec.label(),
                error = %e,
                "Indicator {} indeterminate: {}",
                spec.label(),
                e
            );
            DirectionalState::Indeterminate
        }
    }
}
