//! HTTP control and read API using Axum

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::config::ConfigError;
use crate::core::runtime::WatchRuntime;
use crate::models::indicators::IndicatorSpec;
use crate::models::signal::AlertSubscription;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<WatchRuntime>,
    pub health: Arc<RwLock<HealthStatus>>,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(runtime: Arc<WatchRuntime>) -> Self {
        Self {
            runtime,
            health: Arc::new(RwLock::new(HealthStatus::default())),
            start_time: Arc::new(Instant::now()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Maps configuration errors onto HTTP statuses.
pub struct ApiError(ConfigError);

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ConfigError::UnknownAsset(_) | ConfigError::IndicatorIndex(_) => StatusCode::NOT_FOUND,
            ConfigError::DuplicateAsset(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        warn!(status = %status, error = %self.0, "Rejected request: {}", self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "trendwatch"
    }))
}

#[derive(Debug, Deserialize)]
struct AddAssetRequest {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionRequest {
    subscription: AlertSubscription,
}

#[derive(Debug, Deserialize)]
struct MoveIndicatorRequest {
    to: usize,
}

async fn list_assets(State(state): State<AppState>) -> Json<Value> {
    let watchlist = state.runtime.watchlist().await;
    let assets: Vec<Value> = watchlist
        .assets
        .iter()
        .map(|asset| {
            json!({
                "symbol": asset,
                "subscription": watchlist.subscription(asset),
            })
        })
        .collect();
    Json(json!(assets))
}

async fn add_asset(
    State(state): State<AppState>,
    Json(request): Json<AddAssetRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let asset = state.runtime.add_asset(&request.symbol).await?;
    Ok((StatusCode::CREATED, Json(json!({ "symbol": asset }))))
}

async fn remove_asset(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.runtime.remove_asset(&symbol).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cycle_subscription(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let subscription = state.runtime.cycle_subscription(&symbol).await?;
    Ok(Json(json!({ "subscription": subscription })))
}

async fn set_subscription(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let subscription = state
        .runtime
        .set_subscription(&symbol, request.subscription)
        .await?;
    Ok(Json(json!({ "subscription": subscription })))
}

async fn list_indicators(State(state): State<AppState>) -> Json<Value> {
    let watchlist = state.runtime.watchlist().await;
    let indicators: Vec<Value> = watchlist
        .indicators
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            json!({
                "index": index,
                "label": spec.label(),
                "spec": spec,
            })
        })
        .collect();
    Json(json!(indicators))
}

async fn add_indicator(
    State(state): State<AppState>,
    Json(spec): Json<IndicatorSpec>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let index = state.runtime.add_indicator(spec).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "index": index, "label": spec.label() })),
    ))
}

async fn update_indicator(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(spec): Json<IndicatorSpec>,
) -> Result<Json<Value>, ApiError> {
    let previous = state.runtime.update_indicator(index, spec).await?;
    Ok(Json(json!({
        "index": index,
        "label": spec.label(),
        "previous": previous.label(),
    })))
}

async fn remove_indicator(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<StatusCode, ApiError> {
    state.runtime.remove_indicator(index).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_indicator(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<MoveIndicatorRequest>,
) -> Result<StatusCode, ApiError> {
    state.runtime.move_indicator(index, request.to).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_trends(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.runtime.trends().await))
}

async fn list_alerts(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.runtime.alert_history().await))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/assets", get(list_assets).post(add_asset))
        .route("/api/assets/{symbol}", delete(remove_asset))
        .route(
            "/api/assets/{symbol}/subscription",
            post(cycle_subscription).put(set_subscription),
        )
        .route("/api/indicators", get(list_indicators).post(add_indicator))
        .route(
            "/api/indicators/{index}",
            put(update_indicator).delete(remove_indicator),
        )
        .route("/api/indicators/{index}/move", post(move_indicator))
        .route("/api/trends", get(list_trends))
        .route("/api/alerts", get(list_alerts))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    runtime: Arc<WatchRuntime>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(AppState::new(runtime));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
