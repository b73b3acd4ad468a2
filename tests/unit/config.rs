//! Unit tests for configuration defaults and validation

use std::time::Duration;

use trendwatch::config::{ConfigError, MonitorConfig, DEFAULT_MEXC_REST_URL};

#[test]
fn test_monitor_config_default() {
    let config = MonitorConfig::default();
    assert_eq!(config.port, 8080);
    assert_eq!(config.mexc_rest_url, DEFAULT_MEXC_REST_URL);
    assert_eq!(config.candle_limit, 300);
    assert_eq!(config.fetch_max_attempts, 3);
    assert_eq!(config.fetch_retry_delay, Duration::from_secs(2));
    assert_eq!(config.candle_close_delay, Duration::from_secs(5));
    assert_eq!(config.alert_cooldown, Duration::from_secs(60));
    assert_eq!(config.alert_history_limit, 50);
    assert!(config.alert_webhook_url.is_none());
}

#[test]
fn test_default_close_window_is_valid() {
    assert!(MonitorConfig::default().validate().is_ok());
}

#[test]
fn test_close_window_must_fit_inside_five_minutes() {
    let config = MonitorConfig {
        candle_close_delay: Duration::from_secs(400),
        boundary_tolerance: Duration::from_secs(30),
        ..MonitorConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Env { .. })));

    let edge = MonitorConfig {
        candle_close_delay: Duration::from_secs(270),
        boundary_tolerance: Duration::from_secs(30),
        ..MonitorConfig::default()
    };
    assert!(matches!(edge.validate(), Err(ConfigError::Env { .. })));

    let fits = MonitorConfig {
        candle_close_delay: Duration::from_secs(269),
        ..edge
    };
    assert!(fits.validate().is_ok());
}
