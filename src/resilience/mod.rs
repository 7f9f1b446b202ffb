//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs (fail fast while open)
//!     → timeouts.rs (connect phase, then read phase)
//!     → retries.rs (classify status, check attempt budget)
//!     → backoff.rs (delay before next attempt)
//!     → circuit_breaker.rs (record failure / success)
//!
//! Stream reconnect:
//!     → backoff.rs (ReconnectBackoff: floor, double, ceiling)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every transport call has a deadline
//! - Breaker time comes from an injectable clock (clock.rs)
//! - Jittered backoff prevents retry storms across many clients

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod retries;
pub mod timeouts;

pub use backoff::ReconnectBackoff;
pub use circuit_breaker::CircuitBreaker;
pub use clock::{Clock, ManualClock, TokioClock};
