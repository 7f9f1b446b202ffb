//! One-shot health probe.

use crate::http::client::ResilientClient;
use crate::http::transport::HttpTransport;

/// Default probe path.
pub const HEALTH_PATH: &str = "/health";

/// `GET {base_url}/health`; true only for a 2xx answer.
pub async fn check_health<T: HttpTransport>(client: &ResilientClient<T>) -> bool {
    probe(client, HEALTH_PATH).await
}

/// Probe `path` relative to the client's base URL.
pub async fn probe<T: HttpTransport>(client: &ResilientClient<T>, path: &str) -> bool {
    match client.get(path).await {
        Ok(response) if response.is_success() => true,
        Ok(response) => {
            tracing::warn!(path, status = %response.status, "Health check failed: non-success status");
            false
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "Health check failed");
            false
        }
    }
}
