//! Closed-candle series retrieval with bounded retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::indicators::Candle;
use crate::models::timeframe::Timeframe;
use crate::models::watchlist::Asset;
use crate::services::market_data::{MarketDataError, MarketDataProvider};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: usize,
        #[source]
        source: MarketDataError,
    },
    #[error("no closed candles in fetched series")]
    NoClosedCandles,
}

/// Sorts by open time, drops duplicates and removes trailing candles whose
/// span has not fully elapsed at `now`.
pub fn prepare_series(
    mut candles: Vec<Candle>,
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Result<Vec<Candle>, FetchError> {
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);

    while candles
        .last()
        .is_some_and(|last| !last.is_closed(timeframe, now))
    {
        candles.pop();
    }

    if candles.is_empty() {
        return Err(FetchError::NoClosedCandles);
    }
    Ok(candles)
}

/// Fetches fresh series on every call; nothing is cached.
pub struct SeriesFetcher {
    provider: Arc<dyn MarketDataProvider>,
    limit: usize,
    retry_delay: Duration,
}

impl SeriesFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, limit: usize, retry_delay: Duration) -> Self {
        Self {
            provider,
            limit,
            retry_delay,
        }
    }

    /// Closed candles for `(asset, timeframe)`, oldest first.
    ///
    /// Transient upstream failures are retried with a fixed delay until
    /// `max_attempts` attempts have been made.
    pub async fn fetch(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        max_attempts: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        let max_attempts = max_attempts.max(1);
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let provider = &self.provider;
        let limit = self.limit;

        let backoff = ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(max_attempts - 1);

        let raw = (move || async move {
            let attempt = counter.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                symbol = %asset,
                timeframe = %timeframe,
                attempt = attempt,
                "Fetching {} ({}) - attempt {}",
                asset,
                timeframe,
                attempt
            );
            provider.get_candles(asset, timeframe, limit).await
        })
        .retry(backoff)
        .when(|e: &MarketDataError| e.is_transient())
        .notify(|e: &MarketDataError, delay: Duration| {
            warn!(
                symbol = %asset,
                timeframe = %timeframe,
                error = %e,
                "Fetch of {} ({}) failed: {} - retrying in {:?}",
                asset,
                timeframe,
                e,
                delay
            );
        })
        .await
        .map_err(|source| FetchError::Failed {
            attempts: attempts.load(Ordering::Relaxed),
            source,
        })?;

        let series = prepare_series(raw, timeframe, Utc::now())?;
        debug!(
            symbol = %asset,
            timeframe = %timeframe,
            count = series.len(),
            last_closed = %series[series.len() - 1].open_time,
            "Fetched {} closed candles for {} ({})",
            series.len(),
            asset,
            timeframe
        );
        Ok(series)
    }
}
