//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or defaults
//!     → loader.rs (parse, deserialize, apply environment overrides)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed by value to ResilientClient / StreamClient
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; clients are rebuilt to pick up changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, ClientConfig, HealthCheckConfig, HttpConfig, ObservabilityConfig, StreamConfig,
};
