//! Lifecycle management for long-running tasks.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber's recv() resolves
//!     → health monitor exits, stream client shuts down
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; tasks subscribe, nobody polls a flag
//! - Triggering twice is harmless

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
