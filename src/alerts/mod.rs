//! Edge-triggered, cooldown-limited trend alerts.

pub mod engine;
pub mod sink;

pub use engine::{AlertBook, AlertEngine, CooldownWindow};
pub use sink::{FanoutSink, LogSink, NotificationSink, SinkError, WebhookSink};
