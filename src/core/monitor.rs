//! One evaluation pass: fetch -> indicators -> aggregate -> alert, for every
//! asset that has indicators on the firing timeframe.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertEngine;
use crate::indicators::evaluate;
use crate::models::indicators::IndicatorSpec;
use crate::models::signal::{DirectionalState, Trend, TrendAlert};
use crate::models::timeframe::Timeframe;
use crate::models::watchlist::Asset;
use crate::services::fetcher::SeriesFetcher;
use crate::signals::engine::{AssetTrend, TrendBoard};
use crate::store::WatchlistStore;

/// Outcome of one pass, mostly for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub evaluated: usize,
    pub fetch_failures: usize,
    pub faults: usize,
    pub alerts: Vec<TrendAlert>,
}

enum AssetOutcome {
    Evaluated {
        fetch_failed: bool,
        alert: Option<TrendAlert>,
    },
    Skipped,
}

pub struct TrendMonitor {
    store: Arc<WatchlistStore>,
    fetcher: SeriesFetcher,
    alerts: Arc<AlertEngine>,
    board: Mutex<TrendBoard>,
    /// One pass per timeframe at a time, so a slower pass can never record
    /// an older series over a newer one.
    passes: HashMap<Timeframe, Mutex<()>>,
    max_attempts: usize,
    concurrency: usize,
}

impl TrendMonitor {
    pub fn new(
        store: Arc<WatchlistStore>,
        fetcher: SeriesFetcher,
        alerts: Arc<AlertEngine>,
        max_attempts: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            alerts,
            board: Mutex::new(TrendBoard::new()),
            passes: Timeframe::ALL
                .into_iter()
                .map(|timeframe| (timeframe, Mutex::new(())))
                .collect(),
            max_attempts,
            concurrency: concurrency.max(1),
        }
    }

    /// Evaluates every rostered asset against the indicators on `timeframe`.
    ///
    /// Each asset runs in its own task: a fault in one asset is logged and
    /// leaves that asset's alert memory untouched, the others carry on.
    pub async fn evaluate_timeframe(self: &Arc<Self>, timeframe: Timeframe) -> PassReport {
        self.run_pass(timeframe, true).await
    }

    async fn run_pass(self: &Arc<Self>, timeframe: Timeframe, settle: bool) -> PassReport {
        let _pass = match self.passes.get(&timeframe) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        let watchlist = self.store.snapshot().await;
        let specs: Vec<IndicatorSpec> = watchlist
            .indicators
            .iter()
            .filter(|spec| spec.timeframe == timeframe)
            .copied()
            .collect();

        let mut report = PassReport::default();
        if specs.is_empty() || watchlist.assets.is_empty() {
            debug!(timeframe = %timeframe, "Nothing to evaluate for {}", timeframe);
            return report;
        }

        info!(
            timeframe = %timeframe,
            assets = watchlist.assets.len(),
            indicators = specs.len(),
            "Evaluating {} assets on {}",
            watchlist.assets.len(),
            timeframe
        );

        let specs = Arc::new(specs);
        let results: Vec<(Asset, Result<AssetOutcome, tokio::task::JoinError>)> =
            stream::iter(watchlist.assets)
                .map(|asset| {
                    let monitor = Arc::clone(self);
                    let specs = Arc::clone(&specs);
                    let task_asset = asset.clone();
                    async move {
                        let handle = tokio::spawn(async move {
                            monitor
                                .evaluate_asset(&task_asset, timeframe, &specs, settle)
                                .await
                        });
                        (asset, handle.await)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        for (asset, result) in results {
            match result {
                Ok(AssetOutcome::Evaluated {
                    fetch_failed,
                    alert,
                }) => {
                    report.evaluated += 1;
                    if fetch_failed {
                        report.fetch_failures += 1;
                    }
                    report.alerts.extend(alert);
                }
                Ok(AssetOutcome::Skipped) => {}
                Err(e) => {
                    report.faults += 1;
                    error!(
                        symbol = %asset,
                        timeframe = %timeframe,
                        error = %e,
                        "Evaluation of {} on {} aborted: {}",
                        asset,
                        timeframe,
                        e
                    );
                }
            }
        }

        info!(
            timeframe = %timeframe,
            evaluated = report.evaluated,
            fetch_failures = report.fetch_failures,
            faults = report.faults,
            alerts = report.alerts.len(),
            "Finished {} pass: {} evaluated, {} fetch failures, {} alerts",
            timeframe,
            report.evaluated,
            report.fetch_failures,
            report.alerts.len()
        );
        report
    }

    /// Fills the board from every active timeframe, then sets each asset's
    /// baseline once. Used at startup so the first trend an asset is seen in
    /// already accounts for all of its indicators. Never alerts: an asset a
    /// scheduled pass already observed keeps that baseline.
    pub async fn warm_up(self: &Arc<Self>) -> Vec<(Timeframe, PassReport)> {
        let timeframes = self.store.snapshot().await.active_timeframes();
        info!(timeframes = ?timeframes, "Warm-up pass over {} timeframes", timeframes.len());

        let mut reports = Vec::with_capacity(timeframes.len());
        for timeframe in timeframes {
            let report = self.run_pass(timeframe, false).await;
            reports.push((timeframe, report));
        }

        let now = Utc::now();
        let mut primed = 0;
        {
            let mut board = self.board.lock().await;
            let watchlist = self.store.snapshot().await;
            for asset in &watchlist.assets {
                let trend = board.settle(asset, &watchlist.indicators, now);
                if self.alerts.prime(asset, trend).await {
                    primed += 1;
                }
            }
        }
        info!(primed, "Warm-up set {} baselines", primed);
        reports
    }

    /// Re-aggregates every rostered asset from the states already on the board.
    pub async fn settle_all(&self) -> Vec<TrendAlert> {
        let now = Utc::now();
        let alerts = {
            let mut board = self.board.lock().await;
            let watchlist = self.store.snapshot().await;
            let mut alerts = Vec::new();
            for asset in &watchlist.assets {
                let trend = board.settle(asset, &watchlist.indicators, now);
                alerts.extend(
                    self.alerts
                        .decide(asset, trend, watchlist.subscription(asset), now)
                        .await,
                );
            }
            alerts
        };

        for alert in &alerts {
            self.alerts.deliver(alert).await;
        }
        alerts
    }

    async fn evaluate_asset(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        specs: &[IndicatorSpec],
        settle: bool,
    ) -> AssetOutcome {
        let (states, fetch_failed) = match self.fetcher.fetch(asset, timeframe, self.max_attempts).await {
            Ok(series) => (
                specs.iter().map(|spec| evaluate(&series, spec)).collect::<Vec<_>>(),
                false,
            ),
            Err(e) => {
                warn!(
                    symbol = %asset,
                    timeframe = %timeframe,
                    error = %e,
                    "No usable series for {} ({}): {}",
                    asset,
                    timeframe,
                    e
                );
                (vec![DirectionalState::Indeterminate; specs.len()], true)
            }
        };

        let now = Utc::now();
        let alert = {
            // Board and alert memory change together so passes on other
            // timeframes never interleave with this asset's update.
            let mut board = self.board.lock().await;
            let watchlist = self.store.snapshot().await;
            if !watchlist.contains(asset) {
                debug!(symbol = %asset, "{} left the watchlist mid-pass, discarding", asset);
                return AssetOutcome::Skipped;
            }

            for (spec, state) in specs.iter().zip(states) {
                board.record(asset, *spec, state);
            }
            if !settle {
                return AssetOutcome::Evaluated {
                    fetch_failed,
                    alert: None,
                };
            }
            let trend = board.settle(asset, &watchlist.indicators, now);
            debug!(
                symbol = %asset,
                timeframe = %timeframe,
                trend = %trend,
                "{} trend after {} update: {}",
                asset,
                timeframe,
                trend
            );

            self.alerts
                .decide(asset, trend, watchlist.subscription(asset), now)
                .await
        };

        if let Some(alert) = &alert {
            self.alerts.deliver(alert).await;
        }

        AssetOutcome::Evaluated {
            fetch_failed,
            alert,
        }
    }

    /// Current board, in roster and indicator order.
    pub async fn snapshot(&self) -> Vec<AssetTrend> {
        let watchlist = self.store.snapshot().await;
        self.board
            .lock()
            .await
            .snapshot(&watchlist.assets, &watchlist.indicators)
    }

    pub async fn trend(&self, asset: &Asset) -> Option<Trend> {
        self.alerts.last_trend(asset).await
    }

    /// Drops everything remembered about an asset.
    pub async fn forget(&self, asset: &Asset) {
        let mut board = self.board.lock().await;
        board.forget(asset);
        self.alerts.forget(asset).await;
    }
}
