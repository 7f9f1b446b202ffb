//! Persistent message stream.
//!
//! # Responsibilities
//! - Keep one duplex connection alive, reconnecting with capped exponential backoff
//! - Queue outbound messages while disconnected and flush them in order on open
//! - Decode inbound frames and hand them to a single subscriber
//!
//! # Data Flow
//! ```text
//! caller ──send/connect──▶ StreamClient ──▶ driver task
//!                                              │
//!                        StreamMachine ◀───────┤ (inputs → effects)
//!                                              │
//!                        Connector/DuplexHandle ◀─┘ (socket I/O)
//! ```

pub mod client;
pub mod machine;
pub mod protocol;
pub mod transport;

pub use client::{build_url, MessageListener, StatusListener, StreamClient, StreamError};
pub use machine::{ConnectionStatus, Effect, Generation, Phase, StreamMachine};
pub use protocol::{IncomingMessage, OutgoingMessage, ProtocolError};
pub use transport::{Connector, DuplexHandle, TransportEvent, TransportSide, WsConnector};
