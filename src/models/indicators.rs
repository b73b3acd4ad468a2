use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timeframe::Timeframe;

/// One OHLCV bar, keyed by the instant it opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        open_time: DateTime<Utc>,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn close_time(&self, timeframe: Timeframe) -> DateTime<Utc> {
        self.open_time + timeframe.duration()
    }

    /// A candle is closed once its whole span lies at or before `now`.
    pub fn is_closed(&self, timeframe: Timeframe, now: DateTime<Utc>) -> bool {
        self.close_time(timeframe) <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmaIndicator {
    pub value: f64,
    pub period: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdIndicator {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<(u32, u32, u32)>,
}

/// Indicator family and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum IndicatorKind {
    Ema { period: u32 },
    Macd { fast: u32, slow: u32, signal: u32 },
}

/// A configured indicator evaluated on one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorSpec {
    #[serde(flatten)]
    pub kind: IndicatorKind,
    pub timeframe: Timeframe,
}

impl IndicatorSpec {
    pub fn ema(period: u32, timeframe: Timeframe) -> Self {
        Self {
            kind: IndicatorKind::Ema { period },
            timeframe,
        }
    }

    pub fn macd(fast: u32, slow: u32, signal: u32, timeframe: Timeframe) -> Self {
        Self {
            kind: IndicatorKind::Macd { fast, slow, signal },
            timeframe,
        }
    }

    /// Short column label, e.g. `EMA21(15m)` or `MACD12/26/9(1h)`.
    pub fn label(&self) -> String {
        match self.kind {
            IndicatorKind::Ema { period } => format!("EMA{}({})", period, self.timeframe),
            IndicatorKind::Macd { fast, slow, signal } => {
                format!("MACD{}/{}/{}({})", fast, slow, signal, self.timeframe)
            }
        }
    }
}
