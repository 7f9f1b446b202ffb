//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and their schemes
//! - Validate value ranges (timeouts > 0, threshold >= 1, floor <= ceiling)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "http.base_url").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "http.base_url", &config.http.base_url, &["http", "https"]);
    check_url(&mut errors, "stream.url", &config.stream.url, &["ws", "wss"]);

    if config.http.client_name.trim().is_empty() {
        errors.push(ValidationError::new("http.client_name", "must not be empty"));
    }
    if config.http.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("http.connect_timeout_ms", "must be greater than zero"));
    }
    if config.http.read_timeout_ms == 0 {
        errors.push(ValidationError::new("http.read_timeout_ms", "must be greater than zero"));
    }

    let breaker = &config.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("circuit_breaker.failure_threshold", "must be at least 1"));
    }
    if breaker.window_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.window_ms", "must be greater than zero"));
    }

    let stream = &config.stream;
    if stream.backoff_floor_ms == 0 {
        errors.push(ValidationError::new("stream.backoff_floor_ms", "must be greater than zero"));
    }
    if stream.backoff_floor_ms > stream.backoff_ceiling_ms {
        errors.push(ValidationError::new(
            "stream.backoff_ceiling_ms",
            format!(
                "ceiling {} is below floor {}",
                stream.backoff_ceiling_ms, stream.backoff_floor_ms
            ),
        ));
    }

    let health = &config.health_check;
    if health.enabled && health.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than zero"));
    }
    if !health.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }
    if health.unhealthy_threshold == 0 || health.healthy_threshold == 0 {
        errors.push(ValidationError::new("health_check", "thresholds must be at least 1"));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("'{}' is not a socket address", addr),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, schemes: &[&str]) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("scheme '{}' not in {:?}", url.scheme(), schemes),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}
