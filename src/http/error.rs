//! Request error types.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::resilience::timeouts::{DeadlineExceeded, Phase};

/// Failures reported by an [`HttpTransport`](crate::http::HttpTransport).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the backend (DNS, refused, TLS).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request failed after the connection was made.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("body read failed: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Errors surfaced by [`ResilientClient::execute`](crate::http::ResilientClient::execute).
///
/// Client errors (4xx other than 429) are not in here: they come back as
/// ordinary responses.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The circuit is open; do not retry before `retry_in` has elapsed.
    #[error("circuit open, retry in {}ms", retry_in.as_millis())]
    CircuitOpen { retry_in: Duration },

    /// No response headers within the connect timeout.
    #[error("connect timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// Body not fully read within the read timeout.
    #[error("read timeout after {}ms", .0.as_millis())]
    ReadTimeout(Duration),

    /// The backend answered with a 5xx status.
    #[error("server error: HTTP {status}")]
    ServerError { status: StatusCode },

    /// The backend kept answering 429 until the attempts ran out.
    #[error("rate limited by backend")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request could not be built (bad URL or header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// How long the caller should wait before trying again, if known.
    pub fn retry_in(&self) -> Option<Duration> {
        match self {
            RequestError::CircuitOpen { retry_in } => Some(*retry_in),
            RequestError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<DeadlineExceeded> for RequestError {
    fn from(exceeded: DeadlineExceeded) -> Self {
        match exceeded.phase {
            Phase::Connect => RequestError::ConnectTimeout(exceeded.limit),
            Phase::Read => RequestError::ReadTimeout(exceeded.limit),
        }
    }
}

/// Result type for request operations.
pub type RequestResult<T> = Result<T, RequestError>;
