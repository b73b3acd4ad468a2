//! Trendwatch daemon
//!
//! Watches the configured assets on every timeframe their indicators use,
//! fires trend alerts, and serves the control API.

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};
use trendwatch::alerts::{FanoutSink, LogSink, NotificationSink, WebhookSink};
use trendwatch::config::{get_environment, MonitorConfig};
use trendwatch::core::http::start_server;
use trendwatch::core::runtime::WatchRuntime;
use trendwatch::logging;
use trendwatch::services::mexc::MexcMarketDataProvider;
use trendwatch::store::{JsonFileStore, WatchlistStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    logging::init_logging();

    let config = MonitorConfig::from_env()?;
    info!(environment = %get_environment(), "Starting trendwatch");
    info!(
        upstream = %config.mexc_rest_url,
        watchlist = %config.watchlist_path.display(),
        port = config.port,
        "Upstream {}, watchlist at {}",
        config.mexc_rest_url,
        config.watchlist_path.display()
    );

    let backend = Arc::new(JsonFileStore::new(config.watchlist_path.clone()));
    let store = Arc::new(WatchlistStore::load(backend).await);

    let provider = Arc::new(MexcMarketDataProvider::new(
        config.mexc_rest_url.clone(),
        config.request_timeout,
    ));

    let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink)];
    if let Some(url) = &config.alert_webhook_url {
        info!(url = %url, "Alert webhook enabled");
        sinks.push(Arc::new(WebhookSink::new(url.clone())));
    }
    let sink = Arc::new(FanoutSink::new(sinks));

    let runtime = Arc::new(WatchRuntime::new(&config, store, provider, sink));
    runtime.start().await;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_runtime = Arc::clone(&runtime);
    let port = config.port;
    let mut server_handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = stop_rx.await;
        };
        if let Err(e) = start_server(port, server_runtime, shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down...");
            let _ = stop_tx.send(());
            let _ = (&mut server_handle).await;
        }
        _ = &mut server_handle => {
            error!("HTTP server stopped");
        }
    }

    runtime.shutdown().await;
    info!("Trendwatch stopped");
    Ok(())
}
