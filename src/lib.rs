//! Resilient network access layer for the Codeword client.
//!
//! Two transports share one resilience and observability stack:
//!
//! ```text
//!            ┌────────────────────────────────────────────────────────────────────┐
//!            │                            codeword-net                            │
//!            │                                                                    │
//! execute ───┼─▶ http::ResilientClient ──▶ resilience ──▶ HttpTransport ──────────┼──▶ REST API
//!            │   (request id, headers)   (breaker,       (reqwest)                │
//!            │                           retry, timeouts)                         │
//!            │                                                                    │
//! send ──────┼─▶ stream::StreamClient ──▶ StreamMachine ──▶ Connector ────────────┼──▶ WebSocket
//! listeners ◀┼── (driver task)           (queue, backoff)   (tungstenite)         │
//!            │                                                                    │
//!            │  config · observability · health · lifecycle                       │
//!            └────────────────────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod stream;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ClientConfig;
pub use http::{RequestError, ResilientClient};
pub use lifecycle::Shutdown;
pub use stream::{ConnectionStatus, IncomingMessage, OutgoingMessage, StreamClient};
