//! Unit tests for the candle scheduler, on tokio's paused clock

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use trendwatch::alerts::{AlertEngine, LogSink};
use trendwatch::core::clock::CandleClock;
use trendwatch::core::monitor::TrendMonitor;
use trendwatch::core::scheduler::{CandleScheduler, NowFn};
use trendwatch::models::{Asset, Candle, IndicatorSpec, Timeframe, Watchlist};
use trendwatch::services::{MarketDataError, MarketDataProvider, SeriesFetcher};
use trendwatch::store::{MemoryStore, WatchlistStore};

/// Counts requests and rejects every one of them, so a pass is cheap and
/// never retried.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for CountingProvider {
    async fn get_candles(
        &self,
        _asset: &Asset,
        _timeframe: Timeframe,
        _limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MarketDataError::Api {
            code: 1001,
            message: "contract not exists".to_string(),
        })
    }
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 10).unwrap()
}

/// Wall clock that starts at `base()` and moves with tokio's clock.
fn paused_wall_clock() -> NowFn {
    let start = tokio::time::Instant::now();
    Arc::new(move || base() + TimeDelta::from_std(start.elapsed()).unwrap())
}

async fn monitor(provider: Arc<CountingProvider>) -> Arc<TrendMonitor> {
    let watchlist = Watchlist {
        assets: vec![Asset::new("ADA/USDT:USDT").unwrap()],
        indicators: vec![IndicatorSpec::ema(21, Timeframe::M15)],
        subscriptions: BTreeMap::new(),
    };
    let store = Arc::new(
        WatchlistStore::load(Arc::new(MemoryStore::with_watchlist(watchlist))).await,
    );
    let alerts = Arc::new(AlertEngine::new(Duration::from_secs(60), 50, Arc::new(LogSink)));
    let fetcher = SeriesFetcher::new(provider, 300, Duration::from_millis(1));
    Arc::new(TrendMonitor::new(store, fetcher, alerts, 1, 4))
}

fn clock() -> CandleClock {
    CandleClock::new(Duration::from_secs(5), Duration::from_secs(30))
}

#[tokio::test(start_paused = true)]
async fn test_wakeup_at_close_runs_a_pass() {
    let provider = Arc::new(CountingProvider::default());
    let scheduler =
        CandleScheduler::with_now(clock(), monitor(provider.clone()).await, paused_wall_clock());
    scheduler.sync(&[Timeframe::M15]).await;

    // 10:00:10 -> just before the 10:15:05 close.
    tokio::time::sleep(Duration::from_secs(14 * 60 + 50)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    // 10:15:10, one pass done, next close at 10:30:05.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(15 * 60)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_off_boundary_wakeups_are_skipped_and_rearmed() {
    let provider = Arc::new(CountingProvider::default());
    let frozen = Arc::new(AtomicBool::new(true));
    let wall = paused_wall_clock();
    let now: NowFn = {
        let frozen = Arc::clone(&frozen);
        // While frozen, every timer appears to fire mid-candle.
        let stuck = Utc.with_ymd_and_hms(2024, 7, 1, 10, 7, 0).unwrap();
        Arc::new(move || if frozen.load(Ordering::SeqCst) { stuck } else { wall() })
    };
    let scheduler = CandleScheduler::with_now(clock(), monitor(provider.clone()).await, now);
    scheduler.sync(&[Timeframe::M15]).await;

    tokio::time::sleep(Duration::from_secs(60 * 60)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.live_wakeups(), 1);

    // Clock agrees with the timer again: the pending wakeup (11:04:50) is
    // still off-boundary, the one after it lands on 11:15:05.
    frozen.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_resync_leaves_one_live_wakeup_per_timeframe() {
    let provider = Arc::new(CountingProvider::default());
    let scheduler =
        CandleScheduler::with_now(clock(), monitor(provider.clone()).await, paused_wall_clock());

    for _ in 0..3 {
        scheduler.sync(&[Timeframe::M15, Timeframe::H1]).await;
    }
    // Let the cancelled tasks observe their cancellation.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.live_wakeups(), 2);
    assert_eq!(
        scheduler.active_timeframes().await,
        vec![Timeframe::M15, Timeframe::H1]
    );

    // Only one pass for the 10:15:05 close despite the re-syncs.
    tokio::time::sleep(Duration::from_secs(15 * 60)).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    scheduler.sync(&[Timeframe::H1]).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.live_wakeups(), 1);

    scheduler.stop().await;
    assert_eq!(scheduler.live_wakeups(), 0);
    assert!(scheduler.active_timeframes().await.is_empty());
}
