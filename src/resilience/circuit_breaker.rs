//! Circuit breaker shared by every request of one client.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast until the cool-down ends
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures within the trailing window >= threshold
//! Open → Closed: cool-down instant passes (no probe), or any success
//! ```
//!
//! # Design Decisions
//! - One breaker per client instance, shared across concurrent requests
//! - Fail fast in Open state, reporting the remaining cool-down
//! - A success wipes the failure history entirely
//! - Failure history is kept after the circuit closes again, so a backend that
//!   is still failing reopens it on the next failure inside the window

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::clock::{Clock, TokioClock};

#[derive(Debug, Default)]
struct BreakerState {
    failures: VecDeque<Instant>,
    open_until: Option<Instant>,
}

impl BreakerState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.failures.front() {
            if now.duration_since(oldest) >= window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.open_until {
            Some(until) if now < until => Some(until - now),
            _ => None,
        }
    }
}

/// Sliding-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    window: Duration,
    threshold: usize,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker driven by tokio time.
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    /// Create a breaker with an explicit time source.
    pub fn with_clock(config: &CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: config.window(),
            threshold: config.failure_threshold.max(1),
            cooldown: config.cooldown(),
            clock,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Ok if requests may proceed, otherwise the remaining cool-down.
    pub fn check(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        if let Some(remaining) = state.remaining(now) {
            return Err(remaining);
        }
        state.prune(now, self.window);
        Ok(())
    }

    /// True while the cool-down is running.
    pub fn is_open(&self) -> bool {
        self.check().is_err()
    }

    /// Record a failed attempt, opening the circuit if the window is full.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        state.prune(now, self.window);
        state.failures.push_back(now);

        if state.failures.len() >= self.threshold {
            let was_open = state.remaining(now).is_some();
            state.open_until = Some(now + self.cooldown);
            if !was_open {
                metrics::record_circuit_opened();
                tracing::warn!(
                    failures = state.failures.len(),
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "Circuit opened"
                );
            }
        }
    }

    /// Record a success: clear the history and close the circuit.
    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        if state.open_until.is_some() || !state.failures.is_empty() {
            tracing::debug!(cleared = state.failures.len(), "Circuit reset after success");
        }
        state.failures.clear();
        state.open_until = None;
    }

    /// Failures currently inside the window.
    pub fn failure_count(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("circuit breaker mutex poisoned");
        state.prune(now, self.window);
        state.failures.len()
    }
}
