//! Candle-close arithmetic.
//!
//! Boundaries are exact multiples of the timeframe counted from the Unix
//! epoch, so daily candles close at 00:00 UTC and 4h candles at
//! 00/04/08/12/16/20 UTC. Every close is pushed back by a fixed processing
//! delay to give the upstream time to finalize the candle.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::error;

use crate::models::timeframe::Timeframe;

/// Used when the computed delay is not positive.
pub const MIN_RESCHEDULE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct CandleClock {
    close_delay: TimeDelta,
    tolerance: TimeDelta,
}

impl CandleClock {
    pub fn new(close_delay: Duration, tolerance: Duration) -> Self {
        Self {
            close_delay: TimeDelta::from_std(close_delay).unwrap_or(TimeDelta::seconds(5)),
            tolerance: TimeDelta::from_std(tolerance).unwrap_or(TimeDelta::seconds(30)),
        }
    }

    pub fn close_delay(&self) -> TimeDelta {
        self.close_delay
    }

    /// Start of the candle that contains `now`.
    pub fn boundary_start(timeframe: Timeframe, now: DateTime<Utc>) -> DateTime<Utc> {
        let span = timeframe.seconds();
        let floor = now.timestamp().div_euclid(span) * span;
        DateTime::from_timestamp(floor, 0).unwrap_or(now)
    }

    /// Earliest boundary-plus-delay strictly after `now`.
    pub fn next_close(&self, timeframe: Timeframe, now: DateTime<Utc>) -> DateTime<Utc> {
        let candidate = Self::boundary_start(timeframe, now) + self.close_delay;
        if candidate > now {
            candidate
        } else {
            candidate + timeframe.duration()
        }
    }

    /// Same as [`next_close`](Self::next_close) for a timeframe code; unknown
    /// codes yield `None` and must not be scheduled.
    pub fn next_close_for(&self, code: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let timeframe = Timeframe::from_str(code).ok()?;
        Some(self.next_close(timeframe, now))
    }

    /// Time to sleep until the next close. A non-positive result is a bug;
    /// it is logged and replaced by [`MIN_RESCHEDULE_DELAY`].
    pub fn delay_until_next_close(&self, timeframe: Timeframe, now: DateTime<Utc>) -> Duration {
        let next = self.next_close(timeframe, now);
        match (next - now).to_std() {
            Ok(delay) if !delay.is_zero() => delay,
            _ => {
                error!(
                    timeframe = %timeframe,
                    now = %now,
                    next = %next,
                    "Non-positive delay computed for {}, falling back to {:?}",
                    timeframe,
                    MIN_RESCHEDULE_DELAY
                );
                MIN_RESCHEDULE_DELAY
            }
        }
    }

    /// Whether a timer firing at `at` belongs to a real close of `timeframe`:
    /// at least the processing delay past a boundary and no later than the
    /// delay plus the tolerance.
    pub fn is_boundary_wakeup(&self, timeframe: Timeframe, at: DateTime<Utc>) -> bool {
        let elapsed = at - Self::boundary_start(timeframe, at);
        elapsed >= self.close_delay && elapsed <= self.close_delay + self.tolerance
    }
}

impl Default for CandleClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}
