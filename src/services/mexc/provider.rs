//! MEXC perpetual-contract market data provider (REST).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::messages::KlineResponse;
use crate::models::indicators::Candle;
use crate::models::timeframe::Timeframe;
use crate::models::watchlist::Asset;
use crate::services::market_data::{MarketDataError, MarketDataProvider};

pub struct MexcMarketDataProvider {
    base_url: String,
    timeout: Duration,
    client: RwLock<reqwest::Client>,
    resets: AtomicU64,
}

impl MexcMarketDataProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(base_url, build_client(timeout), timeout)
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: RwLock::new(client),
            resets: AtomicU64::new(0),
        }
    }

    pub fn kline_url(&self, asset: &Asset) -> String {
        format!(
            "{}/api/v1/contract/kline/{}",
            self.base_url,
            asset.exchange_symbol()
        )
    }

    /// How many times the HTTP client has been rebuilt after a transport error.
    pub fn client_resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }

    /// Replaces the HTTP client so the next request starts from fresh connections.
    async fn reset_client(&self) {
        let mut client = self.client.write().await;
        *client = build_client(self.timeout);
        self.resets.fetch_add(1, Ordering::Relaxed);
        debug!("MEXC client reset");
    }

    async fn transport_failure(&self, asset: &Asset, e: reqwest::Error) -> MarketDataError {
        warn!(symbol = %asset, error = %e, "Transport error for {}, resetting client", asset);
        self.reset_client().await;
        MarketDataError::Transport(e)
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            reqwest::Client::new()
        })
}

#[async_trait]
impl MarketDataProvider for MexcMarketDataProvider {
    async fn get_candles(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let end = Utc::now().timestamp();
        let start = end - timeframe.seconds() * limit as i64;
        let url = self.kline_url(asset);

        let client = self.client.read().await.clone();
        let response = client
            .get(&url)
            .query(&[
                ("interval", timeframe.mexc_interval().to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(asset, e).await),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Status(status.as_u16()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(self.transport_failure(asset, e).await),
        };
        let parsed: KlineResponse = serde_json::from_str(&body)
            .map_err(|e| MarketDataError::Malformed(e.to_string()))?;
        let candles = parsed.into_candles()?;

        debug!(
            symbol = %asset,
            timeframe = %timeframe,
            count = candles.len(),
            "MEXC returned {} candles for {} ({})",
            candles.len(),
            asset,
            timeframe
        );
        Ok(candles)
    }
}
