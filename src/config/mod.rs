//! Runtime configuration loaded from the environment (and `.env` if present).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::timeframe::Timeframe;

pub const DEFAULT_MEXC_REST_URL: &str = "https://contract.mexc.com";

/// Hard ceiling on configured indicators.
pub const MAX_INDICATORS: usize = 6;
pub const MIN_PERIOD: u32 = 1;
pub const MAX_PERIOD: u32 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Env { name: String, value: String },
    #[error("{name} period {value} outside [1, 500]")]
    InvalidPeriod { name: &'static str, value: u32 },
    #[error("MACD fast period {fast} must be below slow period {slow}")]
    InvalidMacdPeriods { fast: u32, slow: u32 },
    #[error("at most 6 indicators can be configured")]
    TooManyIndicators,
    #[error("unknown timeframe '{0}'")]
    UnknownTimeframe(String),
    #[error("asset '{0}' is already on the watchlist")]
    DuplicateAsset(String),
    #[error("asset '{0}' is not on the watchlist")]
    UnknownAsset(String),
    #[error("asset symbol must not be empty")]
    EmptyAsset,
    #[error("no indicator at position {0}")]
    IndicatorIndex(usize),
}

/// Returns the deployment environment name (`production`, `sandbox`, ...).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub port: u16,
    pub mexc_rest_url: String,
    pub request_timeout: Duration,
    /// Candles requested from the upstream on every fetch.
    pub candle_limit: usize,
    pub fetch_max_attempts: usize,
    pub fetch_retry_delay: Duration,
    pub fetch_concurrency: usize,
    /// Offset after a candle boundary before the candle is considered final upstream.
    pub candle_close_delay: Duration,
    pub boundary_tolerance: Duration,
    pub alert_cooldown: Duration,
    pub alert_history_limit: usize,
    pub watchlist_path: PathBuf,
    pub alert_webhook_url: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            mexc_rest_url: DEFAULT_MEXC_REST_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            candle_limit: 300,
            fetch_max_attempts: 3,
            fetch_retry_delay: Duration::from_secs(2),
            fetch_concurrency: 4,
            candle_close_delay: Duration::from_secs(5),
            boundary_tolerance: Duration::from_secs(30),
            alert_cooldown: Duration::from_secs(60),
            alert_history_limit: 50,
            watchlist_path: PathBuf::from("watchlist.json"),
            alert_webhook_url: None,
        }
    }
}

impl MonitorConfig {
    /// Builds the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            mexc_rest_url: env::var("MEXC_REST_URL").unwrap_or(defaults.mexc_rest_url),
            request_timeout: parse_var("REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            candle_limit: parse_var("CANDLE_LIMIT")?.unwrap_or(defaults.candle_limit),
            fetch_max_attempts: parse_var::<usize>("FETCH_MAX_ATTEMPTS")?
                .unwrap_or(defaults.fetch_max_attempts)
                .max(1),
            fetch_retry_delay: parse_var("FETCH_RETRY_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_retry_delay),
            fetch_concurrency: parse_var::<usize>("FETCH_CONCURRENCY")?
                .unwrap_or(defaults.fetch_concurrency)
                .max(1),
            candle_close_delay: parse_var("CANDLE_CLOSE_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.candle_close_delay),
            boundary_tolerance: parse_var("BOUNDARY_TOLERANCE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.boundary_tolerance),
            alert_cooldown: parse_var("ALERT_COOLDOWN_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.alert_cooldown),
            alert_history_limit: parse_var("ALERT_HISTORY_LIMIT")?
                .unwrap_or(defaults.alert_history_limit),
            watchlist_path: env::var("WATCHLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.watchlist_path),
            alert_webhook_url: env::var("ALERT_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// A wakeup is only recognized within `candle_close_delay +
    /// boundary_tolerance` of a boundary, and that window has to end before
    /// the next boundary of the shortest timeframe.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.candle_close_delay + self.boundary_tolerance;
        let shortest = Duration::from_secs(Timeframe::M5.seconds().unsigned_abs());
        if window >= shortest {
            return Err(ConfigError::Env {
                name: "CANDLE_CLOSE_DELAY_SECS + BOUNDARY_TOLERANCE_SECS".to_string(),
                value: format!("{}s (must stay below {}s)", window.as_secs(), shortest.as_secs()),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::Env {
                name: name.to_string(),
                value: raw,
            }),
        },
        Err(_) => Ok(None),
    }
}
