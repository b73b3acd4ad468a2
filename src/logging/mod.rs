//! Logging initialization with environment-based formatters
//!
//! - Production: Structured JSON logs for log aggregation
//! - Sandbox: Colorful, human-readable logs for development

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset. HTTP client internals are noisy at `info`.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

fn is_production(env: &str) -> bool {
    matches!(env, "production" | "prod")
}

/// Initialize logging based on the environment
///
/// Calling this twice is a no-op rather than a panic, so the daemon and tests
/// can share it.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stdout);

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = if is_production(&get_environment()) {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer.with_ansi(true)).try_init()
    };
}
