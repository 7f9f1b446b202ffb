//! Resilient request client.
//!
//! # Responsibilities
//! - Fail fast while the circuit is open
//! - Bound each attempt by the connect and read timeouts
//! - Retry transient failures with jittered exponential backoff
//! - Cooperate with 429 rate limiting
//! - Feed every outcome into the shared circuit breaker
//!
//! # Attempt Flow
//! ```text
//! check breaker ──open──▶ CircuitOpen
//!      │
//!      ▼
//! send (connect timeout) ──timeout / error──▶ failure ─┐
//!      │                                               │
//!      ├── 429 ──▶ sleep Retry-After or 2s·(n+1) ──────┤ next attempt
//!      ├── 5xx ──▶ failure ────────────────────────────┤ (after backoff)
//!      ├── 4xx ──▶ read body (best effort), record      │
//!      │           failure, return                     │
//!      └── <400 ─▶ read body (read timeout) ───────────┘ on timeout
//!                      │
//!                      ▼
//!               record success, return
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::{CircuitBreakerConfig, ClientConfig, HttpConfig};
use crate::http::error::{RequestError, RequestResult, TransportError};
use crate::http::request::{resolve_target, ClientHeaders, HttpRequest, RequestId, RequestOptions};
use crate::http::response::HttpResponse;
use crate::http::transport::{HttpTransport, ReqwestTransport};
use crate::observability::metrics;
use crate::resilience::backoff::{
    calculate_backoff, parse_retry_after, rate_limit_delay, RETRY_BASE_MS, RETRY_JITTER_MS,
};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::retries::{classify_status, RetryBudget, StatusClass};
use crate::resilience::timeouts::{bounded, Phase};

/// Result of a single attempt.
enum Attempt {
    Success(HttpResponse),
    ClientError(HttpResponse),
    RateLimited(Option<std::time::Duration>),
    Failed(RequestError),
}

/// HTTP client with timeouts, retries and a circuit breaker.
///
/// Clones share the transport and the circuit breaker, so failures seen by
/// one clone count against all of them.
pub struct ResilientClient<T = ReqwestTransport> {
    transport: Arc<T>,
    breaker: Arc<CircuitBreaker>,
    config: Arc<HttpConfig>,
    headers: ClientHeaders,
}

impl<T> Clone for ResilientClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            breaker: self.breaker.clone(),
            config: self.config.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl ResilientClient<ReqwestTransport> {
    /// Build a client over `reqwest` from the loaded configuration.
    pub fn from_config(config: &ClientConfig) -> RequestResult<Self> {
        Self::with_transport(ReqwestTransport::new(), config.http.clone(), &config.circuit_breaker)
    }
}

impl<T: HttpTransport> ResilientClient<T> {
    /// Build a client over an arbitrary transport.
    pub fn with_transport(transport: T, http: HttpConfig, breaker: &CircuitBreakerConfig) -> RequestResult<Self> {
        Self::with_breaker(transport, http, Arc::new(CircuitBreaker::new(breaker)))
    }

    /// Build a client around an existing breaker.
    pub fn with_breaker(transport: T, http: HttpConfig, breaker: Arc<CircuitBreaker>) -> RequestResult<Self> {
        let headers = ClientHeaders::new(&http.client_name, &http.client_version)?;
        Ok(Self {
            transport: Arc::new(transport),
            breaker,
            config: Arc::new(http),
            headers,
        })
    }

    /// The breaker shared by all clones of this client.
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET `target`.
    pub async fn get(&self, target: &str) -> RequestResult<HttpResponse> {
        self.execute(target, RequestOptions::get()).await
    }

    /// POST `value` as JSON to `target`.
    pub async fn post_json<B: Serialize + ?Sized>(&self, target: &str, value: &B) -> RequestResult<HttpResponse> {
        self.execute(target, RequestOptions::post_json(value)?).await
    }

    /// Perform one logical request.
    ///
    /// `target` is an absolute URL or a path under the configured base URL.
    /// Returns the response for any status below 500 other than 429; client
    /// errors are returned, not raised.
    pub async fn execute(&self, target: &str, options: RequestOptions) -> RequestResult<HttpResponse> {
        let start = Instant::now();
        let method = options.method.to_string();

        if let Err(retry_in) = self.breaker.check() {
            metrics::record_circuit_rejection();
            tracing::warn!(
                target_url = %target,
                retry_in_ms = retry_in.as_millis() as u64,
                "Circuit open, rejecting request"
            );
            return Err(RequestError::CircuitOpen { retry_in });
        }

        let request_id = RequestId::new();
        let url = resolve_target(&self.config.base_url, target)?;
        let request = self.headers.apply(url, options, request_id)?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
            "Executing request"
        );

        let budget = RetryBudget::new(self.config.max_retries);
        let mut last_error = None;

        for attempt in 0..budget.max_attempts() {
            match self.attempt(&request).await {
                Attempt::Success(response) => {
                    self.breaker.record_success();
                    metrics::record_request(&method, "success", start);
                    tracing::debug!(
                        request_id = %request_id,
                        attempt,
                        status = %response.status,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Attempt::ClientError(response) => {
                    self.breaker.record_failure();
                    metrics::record_request(&method, "client_error", start);
                    tracing::info!(
                        request_id = %request_id,
                        attempt,
                        status = %response.status,
                        "Client error, not retrying"
                    );
                    return Ok(response);
                }
                Attempt::RateLimited(retry_after) => {
                    last_error = Some(RequestError::RateLimited { retry_after });
                    if !budget.has_next(attempt) {
                        break;
                    }
                    let delay = rate_limit_delay(attempt, retry_after);
                    metrics::record_retry("rate_limited");
                    tracing::info!(
                        request_id = %request_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, waiting before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Attempt::Failed(error) => {
                    self.breaker.record_failure();
                    tracing::warn!(
                        request_id = %request_id,
                        attempt,
                        error = %error,
                        "Attempt failed"
                    );
                    last_error = Some(error);
                    if !budget.has_next(attempt) {
                        break;
                    }
                    let delay = calculate_backoff(attempt, RETRY_BASE_MS, RETRY_JITTER_MS);
                    metrics::record_retry("transient");
                    tracing::info!(
                        request_id = %request_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        metrics::record_request(&method, "exhausted", start);
        let error = last_error.unwrap_or_else(|| {
            RequestError::Transport(TransportError::Request("no attempt was made".to_string()))
        });
        tracing::error!(request_id = %request_id, error = %error, "Request failed after retries");
        Err(error)
    }

    async fn attempt(&self, request: &HttpRequest) -> Attempt {
        let head = match bounded(
            Phase::Connect,
            self.config.connect_timeout(),
            self.transport.send(request.clone()),
        )
        .await
        {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => return Attempt::Failed(RequestError::Transport(e)),
            Err(exceeded) => return Attempt::Failed(exceeded.into()),
        };

        let status = head.status;
        let class = classify_status(status);
        match class {
            StatusClass::RateLimited => return Attempt::RateLimited(parse_retry_after(&head.headers)),
            StatusClass::ServerError => return Attempt::Failed(RequestError::ServerError { status }),
            StatusClass::Success | StatusClass::ClientError => {}
        }

        let body = match bounded(Phase::Read, self.config.read_timeout(), head.body).await {
            Ok(Ok(body)) => body,
            // A client error is final; an unreadable body must not turn it into a retry.
            Ok(Err(e)) if class == StatusClass::ClientError => {
                tracing::debug!(status = %status, error = %e, "Client error body unreadable, returning it empty");
                Vec::new()
            }
            Err(exceeded) if class == StatusClass::ClientError => {
                tracing::debug!(status = %status, phase = ?exceeded.phase, "Client error body timed out, returning it empty");
                Vec::new()
            }
            Ok(Err(e)) => return Attempt::Failed(RequestError::Transport(e)),
            Err(exceeded) => return Attempt::Failed(exceeded.into()),
        };

        let response = HttpResponse {
            status,
            headers: head.headers,
            body,
        };
        if class == StatusClass::ClientError {
            Attempt::ClientError(response)
        } else {
            Attempt::Success(response)
        }
    }
}

impl<T> std::fmt::Debug for ResilientClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("base_url", &self.config.base_url)
            .field("max_retries", &self.config.max_retries)
            .field("breaker", &self.breaker)
            .finish()
    }
}
