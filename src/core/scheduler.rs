//! Per-timeframe wakeups aligned to candle closes

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::clock::CandleClock;
use crate::core::monitor::TrendMonitor;
use crate::models::timeframe::Timeframe;

/// How long `stop` waits for an in-flight pass before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Wall-clock source for wakeup arithmetic.
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct Wakeup {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Keeps exactly one pending wakeup per active timeframe. Each wakeup sleeps
/// until the next close (plus processing delay), runs one pass for its
/// timeframe and re-arms itself.
pub struct CandleScheduler {
    clock: CandleClock,
    monitor: Arc<TrendMonitor>,
    now: NowFn,
    wakeups: Mutex<HashMap<Timeframe, Wakeup>>,
    live: Arc<AtomicUsize>,
}

/// Counts a wakeup task as live until it returns or is aborted.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CandleScheduler {
    pub fn new(clock: CandleClock, monitor: Arc<TrendMonitor>) -> Self {
        Self::with_now(clock, monitor, Arc::new(Utc::now))
    }

    pub fn with_now(clock: CandleClock, monitor: Arc<TrendMonitor>, now: NowFn) -> Self {
        Self {
            clock,
            monitor,
            now,
            wakeups: Mutex::new(HashMap::new()),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replaces the pending wakeups with one per timeframe in `timeframes`.
    ///
    /// All existing wakeups are cancelled first, so re-syncing with an
    /// unchanged set never leaves duplicates behind.
    pub async fn sync(&self, timeframes: &[Timeframe]) {
        let mut wakeups = self.wakeups.lock().await;

        for (timeframe, wakeup) in wakeups.drain() {
            let _ = wakeup.cancel.send(true);
            debug!(timeframe = %timeframe, "Cancelled wakeup for {}", timeframe);
        }

        for &timeframe in timeframes {
            if wakeups.contains_key(&timeframe) {
                continue;
            }
            let (cancel, cancelled) = watch::channel(false);
            let guard = LiveGuard::enter(&self.live);
            let handle = tokio::spawn(run_wakeups(
                self.clock,
                Arc::clone(&self.monitor),
                Arc::clone(&self.now),
                timeframe,
                cancelled,
                guard,
            ));
            wakeups.insert(timeframe, Wakeup { cancel, handle });
        }

        let mut active: Vec<Timeframe> = wakeups.keys().copied().collect();
        active.sort();
        info!(timeframes = ?active, "Scheduler armed for {} timeframes", active.len());
    }

    pub async fn active_timeframes(&self) -> Vec<Timeframe> {
        let mut active: Vec<Timeframe> = self.wakeups.lock().await.keys().copied().collect();
        active.sort();
        active
    }

    /// Wakeup tasks that have not exited yet, cancelled ones included.
    pub fn live_wakeups(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Cancels every wakeup and waits for in-flight passes to finish.
    pub async fn stop(&self) {
        let drained: Vec<(Timeframe, Wakeup)> = self.wakeups.lock().await.drain().collect();

        for (_, wakeup) in &drained {
            let _ = wakeup.cancel.send(true);
        }

        for (timeframe, wakeup) in drained {
            let abort = wakeup.handle.abort_handle();
            match tokio::time::timeout(STOP_GRACE, wakeup.handle).await {
                Ok(Ok(())) => debug!(timeframe = %timeframe, "Wakeup for {} stopped", timeframe),
                Ok(Err(e)) => {
                    error!(timeframe = %timeframe, error = %e, "Wakeup for {} failed: {}", timeframe, e)
                }
                Err(_) => {
                    warn!(
                        timeframe = %timeframe,
                        "Wakeup for {} did not stop in {:?}, aborting",
                        timeframe,
                        STOP_GRACE
                    );
                    abort.abort();
                }
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_wakeups(
    clock: CandleClock,
    monitor: Arc<TrendMonitor>,
    now_fn: NowFn,
    timeframe: Timeframe,
    mut cancelled: watch::Receiver<bool>,
    _live: LiveGuard,
) {
    loop {
        let now = now_fn();
        let delay = clock.delay_until_next_close(timeframe, now);
        debug!(
            timeframe = %timeframe,
            next = %clock.next_close(timeframe, now),
            "Next {} close in {:?}",
            timeframe,
            delay
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancelled.changed() => break,
        }
        if *cancelled.borrow() {
            break;
        }

        let fired_at = now_fn();
        if !clock.is_boundary_wakeup(timeframe, fired_at) {
            warn!(
                timeframe = %timeframe,
                fired_at = %fired_at,
                "Wakeup for {} fired off-boundary at {}, skipping",
                timeframe,
                fired_at
            );
            continue;
        }

        monitor.evaluate_timeframe(timeframe).await;
    }
    debug!(timeframe = %timeframe, "Wakeup loop for {} exited", timeframe);
}
