//! Wire types of the MEXC contract kline endpoint.
//!
//! The endpoint returns column arrays rather than one object per candle:
//! `{"success":true,"code":0,"data":{"time":[..],"open":[..],...}}`
//! with `time` in epoch seconds.

use chrono::DateTime;
use serde::Deserialize;

use crate::models::indicators::Candle;
use crate::services::market_data::MarketDataError;

#[derive(Debug, Deserialize)]
pub struct KlineResponse {
    pub success: bool,
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
pub struct KlineData {
    pub time: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub vol: Vec<f64>,
}

impl KlineResponse {
    pub fn into_candles(self) -> Result<Vec<Candle>, MarketDataError> {
        if !self.success {
            return Err(MarketDataError::Api {
                code: self.code,
                message: self.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        self.data
            .ok_or_else(|| MarketDataError::Malformed("missing data field".to_string()))?
            .into_candles()
    }
}

impl KlineData {
    pub fn into_candles(self) -> Result<Vec<Candle>, MarketDataError> {
        let len = self.time.len();
        let columns = [
            self.open.len(),
            self.high.len(),
            self.low.len(),
            self.close.len(),
            self.vol.len(),
        ];
        if columns.iter().any(|&column| column != len) {
            return Err(MarketDataError::Malformed(format!(
                "column lengths differ: time={} open/high/low/close/vol={:?}",
                len, columns
            )));
        }

        (0..len)
            .map(|i| {
                let open_time = DateTime::from_timestamp(self.time[i], 0).ok_or_else(|| {
                    MarketDataError::Malformed(format!("invalid timestamp {}", self.time[i]))
                })?;
                Ok(Candle::new(
                    self.open[i],
                    self.high[i],
                    self.low[i],
                    self.close[i],
                    self.vol[i],
                    open_time,
                ))
            })
            .collect()
    }
}
