//! Notification sinks: where fired alerts go.
//!
//! The engine only decides *when* to notify. Rendering, sound and delivery
//! belong to the sink.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::signal::TrendAlert;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(u16),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, alert: &TrendAlert) -> Result<(), SinkError>;
}

/// Writes alerts to the log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, alert: &TrendAlert) -> Result<(), SinkError> {
        info!(
            symbol = %alert.asset,
            trend = %alert.trend,
            timestamp = %alert.timestamp,
            "ALERT: {}",
            alert.message()
        );
        Ok(())
    }
}

/// POSTs every alert as JSON to a webhook.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, alert: &TrendAlert) -> Result<(), SinkError> {
        let payload = serde_json::json!({
            "asset": alert.asset,
            "trend": alert.trend,
            "timestamp": alert.timestamp,
            "message": alert.message(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(SinkError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Delivers to several sinks; the first failure is reported after all have run.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn notify(&self, alert: &TrendAlert) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(alert).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
