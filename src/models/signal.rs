use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::watchlist::Asset;

/// Verdict of a single indicator on a single series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionalState {
    Bullish,
    Bearish,
    /// Not enough data, or the indicator value was undefined.
    Indeterminate,
}

/// Aggregated verdict for one asset across all its indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => f.write_str("Bullish"),
            Trend::Bearish => f.write_str("Bearish"),
            Trend::Neutral => f.write_str("Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSubscription {
    #[default]
    Off,
    NotifyOnBullish,
    NotifyOnBearish,
}

impl AlertSubscription {
    /// Off -> NotifyOnBullish -> NotifyOnBearish -> Off
    pub fn next(self) -> Self {
        match self {
            AlertSubscription::Off => AlertSubscription::NotifyOnBullish,
            AlertSubscription::NotifyOnBullish => AlertSubscription::NotifyOnBearish,
            AlertSubscription::NotifyOnBearish => AlertSubscription::Off,
        }
    }

    pub fn wants(self, trend: Trend) -> bool {
        matches!(
            (self, trend),
            (AlertSubscription::NotifyOnBullish, Trend::Bullish)
                | (AlertSubscription::NotifyOnBearish, Trend::Bearish)
        )
    }
}

/// Notification event handed to the sink when an alert fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAlert {
    pub asset: Asset,
    pub trend: Trend,
    pub timestamp: DateTime<Utc>,
}

impl TrendAlert {
    pub fn message(&self) -> String {
        format!("{} changed to {} trend", self.asset, self.trend)
    }
}
