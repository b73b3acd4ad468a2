//! Alert state machine.
//!
//! Each asset is either uninitialized or remembers the trend it was last seen
//! in. A notification fires only on a transition *into* the direction the
//! asset's subscription asks for, and only while the process-wide cooldown
//! window is closed. The trend memory is updated on every observation,
//! whether or not anything fired.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::alerts::sink::NotificationSink;
use crate::models::signal::{AlertSubscription, Trend, TrendAlert};
use crate::models::watchlist::Asset;

/// Global rate limit shared by all assets.
#[derive(Debug, Clone, Default)]
pub struct CooldownWindow {
    expiry: Option<DateTime<Utc>>,
}

impl CooldownWindow {
    /// Active until the expiry instant; elapses on its own.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| now < expiry)
    }

    pub fn arm(&mut self, now: DateTime<Utc>, length: TimeDelta) {
        self.expiry = Some(now + length);
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }
}

/// Synchronous core of the alert engine. Callers serialize access.
#[derive(Debug)]
pub struct AlertBook {
    memory: HashMap<Asset, Trend>,
    cooldown: CooldownWindow,
    cooldown_length: TimeDelta,
    history: VecDeque<TrendAlert>,
    history_limit: usize,
}

impl AlertBook {
    pub fn new(cooldown: Duration, history_limit: usize) -> Self {
        Self {
            memory: HashMap::new(),
            cooldown: CooldownWindow::default(),
            cooldown_length: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::seconds(60)),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Feeds one evaluation result through the state machine and returns the
    /// alert to deliver, if any.
    pub fn observe(
        &mut self,
        asset: &Asset,
        trend: Trend,
        subscription: AlertSubscription,
        now: DateTime<Utc>,
    ) -> Option<TrendAlert> {
        let Some(last) = self.memory.insert(asset.clone(), trend) else {
            debug!(symbol = %asset, trend = %trend, "First observation for {}: {}", asset, trend);
            return None;
        };

        if last == trend {
            return None;
        }

        info!(
            symbol = %asset,
            from = %last,
            to = %trend,
            "Trend change for {}: {} -> {}",
            asset,
            last,
            trend
        );

        if !subscription.wants(trend) {
            return None;
        }

        if self.cooldown.is_active(now) {
            debug!(
                symbol = %asset,
                trend = %trend,
                "Alert for {} suppressed by cooldown",
                asset
            );
            return None;
        }

        self.cooldown.arm(now, self.cooldown_length);
        let alert = TrendAlert {
            asset: asset.clone(),
            trend,
            timestamp: now,
        };
        self.history.push_front(alert.clone());
        self.history.truncate(self.history_limit);
        Some(alert)
    }

    /// Sets the baseline for an asset that has never been observed. Assets
    /// that already have a trend are left alone, so this never fires.
    pub fn prime(&mut self, asset: &Asset, trend: Trend) -> bool {
        if self.memory.contains_key(asset) {
            return false;
        }
        debug!(symbol = %asset, trend = %trend, "Baseline for {}: {}", asset, trend);
        self.memory.insert(asset.clone(), trend);
        true
    }

    pub fn last_trend(&self, asset: &Asset) -> Option<Trend> {
        self.memory.get(asset).copied()
    }

    pub fn cooldown(&self) -> &CooldownWindow {
        &self.cooldown
    }

    /// Most recent alerts, newest first.
    pub fn history(&self) -> Vec<TrendAlert> {
        self.history.iter().cloned().collect()
    }

    pub fn forget(&mut self, asset: &Asset) {
        self.memory.remove(asset);
    }
}

/// Async front of [`AlertBook`]: the decision runs under one lock so two
/// assets can never both pass the cooldown check, and delivery to the sink
/// happens after the lock is released.
pub struct AlertEngine {
    book: Mutex<AlertBook>,
    sink: Arc<dyn NotificationSink>,
}

impl AlertEngine {
    pub fn new(cooldown: Duration, history_limit: usize, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            book: Mutex::new(AlertBook::new(cooldown, history_limit)),
            sink,
        }
    }

    /// Decides and delivers in one call.
    pub async fn observe(
        &self,
        asset: &Asset,
        trend: Trend,
        subscription: AlertSubscription,
        now: DateTime<Utc>,
    ) -> Option<TrendAlert> {
        let alert = self.decide(asset, trend, subscription, now).await?;
        self.deliver(&alert).await;
        Some(alert)
    }

    /// Runs the state machine under the engine lock. The caller is expected
    /// to [`deliver`](Self::deliver) whatever comes back.
    pub async fn decide(
        &self,
        asset: &Asset,
        trend: Trend,
        subscription: AlertSubscription,
        now: DateTime<Utc>,
    ) -> Option<TrendAlert> {
        let mut book = self.book.lock().await;
        book.observe(asset, trend, subscription, now)
    }

    pub async fn prime(&self, asset: &Asset, trend: Trend) -> bool {
        self.book.lock().await.prime(asset, trend)
    }

    pub async fn deliver(&self, alert: &TrendAlert) {
        info!(
            symbol = %alert.asset,
            trend = %alert.trend,
            "Alert fired for {}: {}",
            alert.asset,
            alert.trend
        );
        if let Err(e) = self.sink.notify(alert).await {
            warn!(
                symbol = %alert.asset,
                error = %e,
                "Notification sink failed for {}: {}",
                alert.asset,
                e
            );
        }
    }

    pub async fn last_trend(&self, asset: &Asset) -> Option<Trend> {
        self.book.lock().await.last_trend(asset)
    }

    pub async fn history(&self) -> Vec<TrendAlert> {
        self.book.lock().await.history()
    }

    pub async fn cooldown_expiry(&self) -> Option<DateTime<Utc>> {
        self.book.lock().await.cooldown().expiry()
    }

    /// Clears the asset's trend memory; used when it leaves the roster.
    pub async fn forget(&self, asset: &Asset) {
        self.book.lock().await.forget(asset);
    }
}
