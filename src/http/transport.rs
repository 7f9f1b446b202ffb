//! Request/response transport.
//!
//! # Responsibilities
//! - Define the call primitive the resilient client is written against
//! - Provide the default implementation over `reqwest`
//!
//! # Design Decisions
//! - No timeouts or retries here; the client owns those
//! - Dropping the returned future aborts the call

use std::future::Future;

use futures_util::FutureExt;

use crate::http::error::TransportError;
use crate::http::request::HttpRequest;
use crate::http::response::ResponseHead;

/// A single request/response call.
pub trait HttpTransport: Send + Sync + 'static {
    /// Send `request`, resolving once response headers are in.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<ResponseHead, TransportError>> + Send;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<ResponseHead, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let mut builder = client
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = async move {
                response
                    .bytes()
                    .await
                    .map(|bytes| bytes.to_vec())
                    .map_err(TransportError::from)
            }
            .boxed();

            Ok(ResponseHead {
                status,
                headers,
                body,
            })
        }
    }
}
