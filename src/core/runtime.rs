//! Wiring of the monitor, scheduler and watchlist into one control point.
//!
//! Every configuration change goes through [`WatchRuntime`], which keeps the
//! scheduler's wakeups in line with the timeframes the indicators use and
//! refreshes the trend board when an indicator change affects it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::alerts::{AlertEngine, NotificationSink};
use crate::config::{ConfigError, MonitorConfig};
use crate::core::clock::CandleClock;
use crate::core::monitor::{PassReport, TrendMonitor};
use crate::core::scheduler::CandleScheduler;
use crate::models::indicators::IndicatorSpec;
use crate::models::signal::{AlertSubscription, TrendAlert};
use crate::models::timeframe::Timeframe;
use crate::models::watchlist::{Asset, Watchlist};
use crate::services::fetcher::SeriesFetcher;
use crate::services::market_data::MarketDataProvider;
use crate::signals::engine::AssetTrend;
use crate::store::WatchlistStore;

pub struct WatchRuntime {
    store: Arc<WatchlistStore>,
    monitor: Arc<TrendMonitor>,
    alerts: Arc<AlertEngine>,
    scheduler: CandleScheduler,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl WatchRuntime {
    pub fn new(
        config: &MonitorConfig,
        store: Arc<WatchlistStore>,
        provider: Arc<dyn MarketDataProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let alerts = Arc::new(AlertEngine::new(
            config.alert_cooldown,
            config.alert_history_limit,
            sink,
        ));
        let fetcher = SeriesFetcher::new(provider, config.candle_limit, config.fetch_retry_delay);
        let monitor = Arc::new(TrendMonitor::new(
            Arc::clone(&store),
            fetcher,
            Arc::clone(&alerts),
            config.fetch_max_attempts,
            config.fetch_concurrency,
        ));
        let clock = CandleClock::new(config.candle_close_delay, config.boundary_tolerance);
        let scheduler = CandleScheduler::new(clock, Arc::clone(&monitor));

        Self {
            store,
            monitor,
            alerts,
            scheduler,
            background: Mutex::new(Vec::new()),
        }
    }

    /// Arms the scheduler and kicks off the warm-up pass in the background.
    pub async fn start(&self) {
        let timeframes = self.store.snapshot().await.active_timeframes();
        self.scheduler.sync(&timeframes).await;

        let monitor = Arc::clone(&self.monitor);
        let handle = tokio::spawn(async move {
            let reports = monitor.warm_up().await;
            info!(passes = reports.len(), "Warm-up finished");
        });
        self.background.lock().await.push(handle);
        info!("Runtime started");
    }

    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        for handle in self.background.lock().await.drain(..) {
            handle.abort();
        }
        info!("Runtime stopped");
    }

    pub fn monitor(&self) -> &Arc<TrendMonitor> {
        &self.monitor
    }

    pub async fn watchlist(&self) -> Watchlist {
        self.store.snapshot().await
    }

    pub async fn trends(&self) -> Vec<AssetTrend> {
        self.monitor.snapshot().await
    }

    pub async fn alert_history(&self) -> Vec<TrendAlert> {
        self.alerts.history().await
    }

    pub async fn scheduled_timeframes(&self) -> Vec<Timeframe> {
        self.scheduler.active_timeframes().await
    }

    /// Runs one pass right away, outside the schedule.
    pub async fn refresh(&self, timeframe: Timeframe) -> PassReport {
        self.monitor.evaluate_timeframe(timeframe).await
    }

    /// New assets are picked up by the next firing of each timeframe.
    pub async fn add_asset(&self, symbol: &str) -> Result<Asset, ConfigError> {
        let asset = self.store.add_asset(symbol).await?;
        info!(symbol = %asset, "Added {} to the watchlist", asset);
        Ok(asset)
    }

    pub async fn remove_asset(&self, symbol: &str) -> Result<Asset, ConfigError> {
        let asset = self.store.remove_asset(symbol).await?;
        self.monitor.forget(&asset).await;
        info!(symbol = %asset, "Removed {} from the watchlist", asset);
        Ok(asset)
    }

    pub async fn add_indicator(&self, spec: IndicatorSpec) -> Result<usize, ConfigError> {
        let index = self.store.add_indicator(spec).await?;
        info!(indicator = %spec.label(), index, "Added indicator {}", spec.label());
        self.reconcile(&[spec.timeframe]).await;
        Ok(index)
    }

    pub async fn update_indicator(
        &self,
        index: usize,
        spec: IndicatorSpec,
    ) -> Result<IndicatorSpec, ConfigError> {
        let previous = self.store.update_indicator(index, spec).await?;
        info!(
            from = %previous.label(),
            to = %spec.label(),
            index,
            "Replaced indicator {} with {}",
            previous.label(),
            spec.label()
        );
        self.reconcile(&[previous.timeframe, spec.timeframe]).await;
        Ok(previous)
    }

    pub async fn remove_indicator(&self, index: usize) -> Result<IndicatorSpec, ConfigError> {
        let removed = self.store.remove_indicator(index).await?;
        info!(indicator = %removed.label(), index, "Removed indicator {}", removed.label());
        self.reconcile(&[removed.timeframe]).await;
        Ok(removed)
    }

    pub async fn move_indicator(&self, from: usize, to: usize) -> Result<(), ConfigError> {
        self.store.move_indicator(from, to).await
    }

    pub async fn set_subscription(
        &self,
        symbol: &str,
        subscription: AlertSubscription,
    ) -> Result<AlertSubscription, ConfigError> {
        self.store.set_subscription(symbol, subscription).await
    }

    pub async fn cycle_subscription(&self, symbol: &str) -> Result<AlertSubscription, ConfigError> {
        self.store.cycle_subscription(symbol).await
    }

    /// Re-syncs the wakeups with the configured timeframes and re-evaluates
    /// the touched ones so the board reflects the new indicator set.
    async fn reconcile(&self, touched: &[Timeframe]) {
        let active = self.store.snapshot().await.active_timeframes();
        self.scheduler.sync(&active).await;

        let mut targets: Vec<Timeframe> = touched
            .iter()
            .copied()
            .filter(|timeframe| active.contains(timeframe))
            .collect();
        targets.sort();
        targets.dedup();
        // A timeframe that lost its last indicator still changes every
        // asset's aggregate, so the board is re-settled as a whole.
        let dropped = touched.iter().any(|timeframe| !active.contains(timeframe));

        let monitor = Arc::clone(&self.monitor);
        let handle = tokio::spawn(async move {
            for timeframe in targets {
                monitor.evaluate_timeframe(timeframe).await;
            }
            if dropped {
                monitor.settle_all().await;
            }
        });

        let mut background = self.background.lock().await;
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }
}
