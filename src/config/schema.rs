//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the network layer.
//! All types derive Serde traits for deserialization from config files, and every
//! default matches the constants the backend contract was designed around.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the network access layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Request/response client settings.
    pub http: HttpConfig,

    /// Circuit breaker shared by all requests of one client.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Persistent stream settings.
    pub stream: StreamConfig,

    /// Backend health probing.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Resilient request client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the backend API (e.g., "http://localhost:9989").
    pub base_url: String,

    /// Value of the `X-Client` header sent with every request.
    pub client_name: String,

    /// Value of the `X-Version` header sent with every request.
    pub client_version: String,

    /// Upper bound on waiting for response headers, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Upper bound on reading the response body, in milliseconds.
    pub read_timeout_ms: u64,

    /// Retries after the first attempt (total attempts = max_retries + 1).
    pub max_retries: u32,
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9989".to_string(),
            client_name: "codeword/ios".to_string(),
            client_version: "1.0.0 (100)".to_string(),
            connect_timeout_ms: 15_000,
            read_timeout_ms: 60_000,
            max_retries: 2,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Sliding window over which failures are counted, in milliseconds.
    pub window_ms: u64,

    /// Failures within the window that open the circuit.
    pub failure_threshold: usize,

    /// How long the circuit stays open, in milliseconds.
    pub cooldown_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_ms: 30_000,
            failure_threshold: 5,
            cooldown_ms: 10_000,
        }
    }
}

/// Persistent stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket endpoint (e.g., "ws://localhost:9989/ws").
    pub url: String,

    /// Reconnect delay after a successful connection, in milliseconds.
    pub backoff_floor_ms: u64,

    /// Largest reconnect delay, in milliseconds.
    pub backoff_ceiling_ms: u64,

    /// Parameters appended to the URL query on every connect.
    ///
    /// WebSocket handshakes from mobile runtimes cannot carry custom
    /// headers, so client identification travels here instead.
    pub query: BTreeMap<String, String>,
}

impl StreamConfig {
    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9989/ws".to_string(),
            backoff_floor_ms: 500,
            backoff_ceiling_ms: 8_000,
            query: BTreeMap::new(),
        }
    }
}

/// Backend health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic health monitor.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Path probed relative to `http.base_url`.
    pub path: String,

    /// Consecutive failures before reporting unhealthy.
    pub unhealthy_threshold: u32,

    /// Consecutive successes before reporting healthy.
    pub healthy_threshold: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            path: "/health".to_string(),
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Allow the binary to install a metrics exporter.
    pub metrics_enabled: bool,

    /// Prometheus scrape endpoint bind address; no exporter when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.http.read_timeout(), Duration::from_secs(60));
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.circuit_breaker.window(), Duration::from_secs(30));
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.cooldown(), Duration::from_secs(10));
        assert_eq!(config.stream.backoff_floor(), Duration::from_millis(500));
        assert_eq!(config.stream.backoff_ceiling(), Duration::from_secs(8));
        assert_eq!(config.health_check.path, "/health");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [http]
            base_url = "https://api.example.com"

            [stream.query]
            client = "codeword-app"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.base_url, "https://api.example.com");
        assert_eq!(config.http.max_retries, 2);
        assert_eq!(config.stream.query.get("client").map(String::as_str), Some("codeword-app"));
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }
}
