//! Backoff schedules.
//!
//! Three schedules live here:
//! - request retries: `base * 2^attempt` plus uniform jitter
//! - rate limiting: server `Retry-After`, else `step * (attempt + 1)`
//! - stream reconnects: doubling delay between a floor and a ceiling

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Base delay for request retries.
pub const RETRY_BASE_MS: u64 = 500;
/// Upper bound (exclusive) of the random jitter added to request retries.
pub const RETRY_JITTER_MS: u64 = 1_000;
/// Per-attempt step used when a 429 carries no `Retry-After`.
pub const RATE_LIMIT_STEP_MS: u64 = 2_000;

/// Exponential delay before retrying after failed attempt `attempt` (0-based).
pub fn calculate_backoff(attempt: u32, base_ms: u64, jitter_ms: u64) -> Duration {
    let exponential = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential);

    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter))
}

/// Delay after a 429 on attempt `attempt` (0-based).
pub fn rate_limit_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    retry_after.unwrap_or_else(|| {
        Duration::from_millis(RATE_LIMIT_STEP_MS.saturating_mul(u64::from(attempt) + 1))
    })
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds.
///
/// HTTP-date values, out-of-range numbers and garbage yield `None`, which falls back to the
/// computed rate-limit delay.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let secs: f64 = raw.parse().ok()?;
    // Rejects negative, NaN and values too large for a Duration.
    Duration::try_from_secs_f64(secs).ok()
}

/// Doubling reconnect delay, reset on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    current: Duration,
    floor: Duration,
    ceiling: Duration,
}

impl ReconnectBackoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            current: floor,
            floor,
            ceiling,
        }
    }

    /// Delay the next reconnect would use.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the current delay and double it for next time, up to the ceiling.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Back to the floor after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}
