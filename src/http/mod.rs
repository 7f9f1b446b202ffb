//! Resilient request/response subsystem.
//!
//! # Data Flow
//! ```text
//! caller: execute(target, RequestOptions)
//!     → client.rs (breaker check, attempt loop)
//!     → request.rs (resolve URL, request ID, fixed headers)
//!     → transport.rs (HttpTransport::send, reqwest by default)
//!     → response.rs (ResponseHead, then HttpResponse once the body is read)
//! ```

pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use client::ResilientClient;
pub use error::{RequestError, RequestResult, TransportError};
pub use request::{HttpRequest, RequestId, RequestOptions, X_CLIENT, X_REQUEST_ID, X_VERSION};
pub use response::{HttpResponse, ResponseHead};
pub use transport::{HttpTransport, ReqwestTransport};
