//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for response headers (connect phase)
//! - Bound the body read once headers arrived (read phase)
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry,
//!   which aborts the underlying transport call
//! - Timeout errors carry the phase and limit so callers can report them distinctly

use std::future::Future;
use std::time::Duration;

/// Which part of an attempt ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Read,
}

/// A deadline that passed before the future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub phase: Phase,
    pub limit: Duration,
}

/// Run `fut`, giving up after `limit`.
pub async fn bounded<F: Future>(phase: Phase, limit: Duration, fut: F) -> Result<F::Output, DeadlineExceeded> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded { phase, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reports_phase_on_expiry() {
        let result = bounded(Phase::Read, Duration::from_secs(60), async {
            tokio::time::sleep(Duration::from_secs(61)).await;
        })
        .await;
        assert_eq!(
            result,
            Err(DeadlineExceeded {
                phase: Phase::Read,
                limit: Duration::from_secs(60)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn passes_through_fast_futures() {
        let result = bounded(Phase::Connect, Duration::from_secs(15), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }
}
