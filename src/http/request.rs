//! Request description and request IDs.
//!
//! # Responsibilities
//! - Generate one request ID per logical request (shared by all its attempts)
//! - Describe what the caller wants sent: method, headers, body
//! - Build the transport-level request with the fixed client headers
//!
//! # Design Decisions
//! - Caller headers override the fixed ones
//! - The body is owned bytes so every attempt can resend it

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::http::error::RequestError;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";
/// Header naming the client application.
pub const X_CLIENT: &str = "x-client";
/// Header carrying the client version.
pub const X_VERSION: &str = "x-version";

/// Correlates all attempts of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to send, minus the destination.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl RequestOptions {
    /// A read request.
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A write request with a raw body.
    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    /// A write request with a JSON body.
    pub fn post_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, RequestError> {
        let body = serde_json::to_vec(value).map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
        Ok(Self::post(body).header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    /// Add or replace a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// A fully resolved request as handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Fixed identification headers attached to every request.
#[derive(Debug, Clone)]
pub struct ClientHeaders {
    client: HeaderValue,
    version: HeaderValue,
}

impl ClientHeaders {
    pub fn new(client_name: &str, client_version: &str) -> Result<Self, RequestError> {
        let parse = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| RequestError::InvalidRequest(format!("header value '{}': {}", value, e)))
        };
        Ok(Self {
            client: parse(client_name)?,
            version: parse(client_version)?,
        })
    }

    /// Build the request for `url`, fixed headers first, caller headers on top.
    pub fn apply(&self, url: Url, options: RequestOptions, request_id: RequestId) -> Result<HttpRequest, RequestError> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(X_CLIENT), self.client.clone());
        headers.insert(HeaderName::from_static(X_VERSION), self.version.clone());
        let id = HeaderValue::from_str(&request_id.to_string())
            .map_err(|e| RequestError::InvalidRequest(e.to_string()))?;
        headers.insert(HeaderName::from_static(X_REQUEST_ID), id);

        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        Ok(HttpRequest {
            method: options.method,
            url,
            headers,
            body: options.body,
        })
    }
}

/// Resolve `target` as an absolute URL, or as a path appended to `base`.
pub fn resolve_target(base: &str, target: &str) -> Result<Url, RequestError> {
    if let Ok(url) = Url::parse(target) {
        return Ok(url);
    }
    let joined = if target.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), target)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), target)
    };
    Url::parse(&joined).map_err(|e| RequestError::InvalidRequest(format!("URL '{}': {}", joined, e)))
}
