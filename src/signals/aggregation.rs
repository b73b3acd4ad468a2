//! Unanimity aggregation of indicator states into one trend.

use crate::models::signal::{DirectionalState, Trend};

/// Bullish only when every state is bullish, bearish only when every state is
/// bearish. Mixed input, any `Indeterminate`, or no input at all is neutral.
pub fn aggregate(states: &[DirectionalState]) -> Trend {
    let Some(first) = states.first() else {
        return Trend::Neutral;
    };

    let unanimous = states.iter().all(|state| state == first);
    match (unanimous, first) {
        (true, DirectionalState::Bullish) => Trend::Bullish,
        (true, DirectionalState::Bearish) => Trend::Bearish,
        _ => Trend::Neutral,
    }
}
