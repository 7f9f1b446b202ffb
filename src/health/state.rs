//! Backend health state machine.
//!
//! # States
//! - Unknown: no verdict yet
//! - Healthy: backend answering
//! - Unhealthy: backend failing probes
//!
//! # State Transitions
//! ```text
//! Unknown | Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! Unknown | Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Counters reset on every opposite outcome

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown,
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        })
    }
}

/// Consecutive-outcome counter with thresholds.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    state: HealthState,
    successes: u32,
    failures: u32,
    healthy_threshold: u32,
    unhealthy_threshold: u32,
}

impl HealthTracker {
    pub fn new(healthy_threshold: u32, unhealthy_threshold: u32) -> Self {
        Self {
            state: HealthState::Unknown,
            successes: 0,
            failures: 0,
            healthy_threshold: healthy_threshold.max(1),
            unhealthy_threshold: unhealthy_threshold.max(1),
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Record one probe outcome. Returns the new state on a transition.
    pub fn record(&mut self, healthy: bool) -> Option<HealthState> {
        let next = if healthy {
            self.failures = 0;
            self.successes = self.successes.saturating_add(1);
            (self.successes >= self.healthy_threshold).then_some(HealthState::Healthy)
        } else {
            self.successes = 0;
            self.failures = self.failures.saturating_add(1);
            (self.failures >= self.unhealthy_threshold).then_some(HealthState::Unhealthy)
        };

        match next {
            Some(state) if state != self.state => {
                self.state = state;
                Some(state)
            }
            _ => None,
        }
    }
}
