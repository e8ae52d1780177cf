use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::ports::HttpResponse;

/// Header carrying how many requests are left in the current window.
pub const REMAINING_HEADER: &str = "x-rate-limit-remaining";
/// Header carrying the epoch second at which the window resets.
pub const RESET_HEADER: &str = "x-rate-limit-reset";

/// Grace period added on top of the server-reported reset instant.
const GRACE: Duration = Duration::from_millis(500);

/// Server-driven throttle.
///
/// Only the most recently observed quota matters: no wait is derived from the
/// historical request rate. State is per instance and never persisted.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    remaining: i64,
    reset: DateTime<Utc>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            remaining: 1,
            reset: Utc::now(),
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset
    }

    /// How long to hold off before the next request, if at all.
    pub fn should_wait(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.remaining != 0 || now >= self.reset {
            return None;
        }
        let left = (self.reset - now).to_std().ok()?;
        Some(left + GRACE)
    }

    /// Overwrite the state. Absent or unparsable values leave it untouched.
    pub fn update(&mut self, remaining: Option<&str>, reset_epoch: Option<&str>) {
        let Some(remaining) = remaining.and_then(|s| s.trim().parse::<i64>().ok()) else {
            return;
        };
        let Some(reset) = reset_epoch
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        else {
            return;
        };
        self.remaining = remaining;
        self.reset = reset;
    }

    pub fn observe(&mut self, resp: &HttpResponse) {
        self.update(resp.header(REMAINING_HEADER), resp.header(RESET_HEADER));
    }
}
