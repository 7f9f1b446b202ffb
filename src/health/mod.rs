//! Backend health probing.
//!
//! # Data Flow
//! ```text
//! One-shot probe (probe.rs):
//!     GET {base_url}/health through the resilient client
//!     → bool
//!
//! Monitor (monitor.rs):
//!     Periodic timer
//!     → probe
//!     → HealthTracker (state.rs)
//!     → watch channel on transition
//! ```
//!
//! # Design Decisions
//! - Probes go through the same client as real traffic, breaker included
//! - State transitions require consecutive successes/failures
//! - A probe never errors; every failure mode reads as unhealthy

pub mod monitor;
pub mod probe;
pub mod state;

pub use monitor::HealthMonitor;
pub use probe::{check_health, probe};
pub use state::{HealthState, HealthTracker};
