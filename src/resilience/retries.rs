//! Retry classification.
//!
//! # Responsibilities
//! - Map a response status to how the retry loop treats it
//! - Decide whether another attempt fits in the budget
//!
//! # Design Decisions
//! - 429 is retried with its own delay and is not a circuit-breaker failure
//! - 5xx, timeouts and connection errors are transient and retried
//! - Other 4xx are returned on the first attempt but still count against the breaker

use reqwest::StatusCode;

/// How the retry loop handles a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Below 400: done.
    Success,
    /// 429: wait and retry.
    RateLimited,
    /// 400-499 except 429: hand back to the caller.
    ClientError,
    /// 500 and above: transient.
    ServerError,
}

/// Classify a response status.
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        429 => StatusClass::RateLimited,
        0..=399 => StatusClass::Success,
        400..=499 => StatusClass::ClientError,
        _ => StatusClass::ServerError,
    }
}

/// Attempt budget for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
}

impl RetryBudget {
    /// `max_retries` retries after the first attempt.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt follows 0-based attempt `attempt`.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }
}
