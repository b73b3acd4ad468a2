//! Market data provider interface.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::indicators::Candle;
use crate::models::timeframe::Timeframe;
use crate::models::watchlist::Asset;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream responded with HTTP {0}")]
    Status(u16),
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl MarketDataError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketDataError::Transport(_) | MarketDataError::Malformed(_) => true,
            MarketDataError::Status(code) => *code == 429 || *code >= 500,
            MarketDataError::Api { .. } => false,
        }
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent `limit` candles for the asset, in whatever order the
    /// upstream returns them. The last one may still be open.
    async fn get_candles(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
