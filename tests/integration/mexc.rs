//! Integration tests for the MEXC REST provider, against a mock upstream

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use trendwatch::core::clock::CandleClock;
use trendwatch::models::{Asset, Timeframe};
use trendwatch::services::{
    FetchError, MarketDataError, MarketDataProvider, MexcMarketDataProvider, SeriesFetcher,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ada() -> Asset {
    Asset::new("ADA/USDT:USDT").unwrap()
}

fn provider(server: &MockServer) -> MexcMarketDataProvider {
    MexcMarketDataProvider::new(server.uri(), Duration::from_secs(5))
}

/// Kline payload with `closed` finished 15m candles and the open one.
fn kline_body(closed: usize) -> Value {
    let current = CandleClock::boundary_start(Timeframe::M15, Utc::now()).timestamp();
    let times: Vec<i64> = (0..=closed as i64)
        .rev()
        .map(|back| current - back * Timeframe::M15.seconds())
        .collect();
    let closes: Vec<f64> = (0..times.len()).map(|i| 0.5 + i as f64 * 0.001).collect();

    json!({
        "success": true,
        "code": 0,
        "data": {
            "time": times,
            "open": closes,
            "high": closes,
            "low": closes,
            "close": closes,
            "vol": vec![1000.0; closes.len()],
        }
    })
}

#[tokio::test]
async fn parses_column_arrays_into_candles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contract/kline/ADA_USDT"))
        .and(query_param("interval", "Min15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kline_body(5)))
        .expect(1)
        .mount(&server)
        .await;

    let candles = provider(&server)
        .get_candles(&ada(), Timeframe::M15, 300)
        .await
        .expect("candles");

    assert_eq!(candles.len(), 6);
    assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
    assert!((candles[0].close - 0.5).abs() < 1e-12);
    assert_eq!(candles[0].volume, 1000.0);
}

#[tokio::test]
async fn api_rejection_is_not_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "code": 1001,
            "message": "contract not exists"
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .get_candles(&ada(), Timeframe::M15, 300)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Api { code: 1001, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn server_errors_and_garbage_are_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contract/kline/ADA_USDT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/contract/kline/XRP_USDT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider
        .get_candles(&ada(), Timeframe::M15, 300)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Status(503)));
    assert!(err.is_transient());

    let xrp = Asset::new("XRP/USDT:USDT").unwrap();
    let err = provider
        .get_candles(&xrp, Timeframe::M15, 300)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Malformed(_)));
    assert!(err.is_transient());
    // The connection itself was fine both times.
    assert_eq!(provider.client_resets(), 0);
}

#[tokio::test]
async fn mismatched_columns_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "code": 0,
            "data": {
                "time": [1_700_000_000, 1_700_000_900],
                "open": [1.0],
                "high": [1.0, 1.0],
                "low": [1.0, 1.0],
                "close": [1.0, 1.0],
                "vol": [1.0, 1.0]
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .get_candles(&ada(), Timeframe::M15, 300)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    let provider = MexcMarketDataProvider::new("http://127.0.0.1:1", Duration::from_secs(1));
    let err = provider
        .get_candles(&ada(), Timeframe::H1, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Transport(_)));
    assert!(err.is_transient());
    assert_eq!(provider.client_resets(), 1);
}

/// Answers one request with headers promising more body than is sent.
async fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 512\r\n\r\n{\"success\":true",
            )
            .await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn cut_off_body_resets_the_client() {
    let provider = MexcMarketDataProvider::new(truncated_body_server().await, Duration::from_secs(5));
    let err = provider
        .get_candles(&ada(), Timeframe::M15, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::Transport(_)));
    assert!(err.is_transient());
    assert_eq!(provider.client_resets(), 1);
}

#[tokio::test]
async fn fetcher_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kline_body(40)))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = SeriesFetcher::new(Arc::new(provider(&server)), 300, Duration::from_millis(5));
    let series = fetcher
        .fetch(&ada(), Timeframe::M15, 3)
        .await
        .expect("third attempt succeeds");

    // The still-open candle is gone.
    assert_eq!(series.len(), 40);
}

#[tokio::test]
async fn fetcher_reports_exhaustion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = SeriesFetcher::new(Arc::new(provider(&server)), 300, Duration::from_millis(5));
    let result = fetcher.fetch(&ada(), Timeframe::M15, 2).await;
    assert!(matches!(
        result,
        Err(FetchError::Failed {
            attempts: 2,
            source: MarketDataError::Status(500)
        })
    ));
}
