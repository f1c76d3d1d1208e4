//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("Reservation lease ({lease_secs}s) must be longer than the dispatch interval ({interval_ms}ms)")]
    LeaseNotLongerThanInterval { lease_secs: u64, interval_ms: u64 },

    #[error("Reservation lease ({lease_secs}s) must be longer than the tick timeout ({tick_timeout_secs}s)")]
    LeaseNotLongerThanTickTimeout { lease_secs: u64, tick_timeout_secs: u64 },

    #[error("Invalid log level directive: {0}")]
    InvalidLogLevel(String),
}
