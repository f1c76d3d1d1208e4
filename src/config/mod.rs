//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CATALOG` prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use catalog_outbox::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Dispatching every {:?}", config.dispatcher.interval());
//! ```

mod collector;
mod database;
mod dispatcher;
mod error;
mod object_store;
mod redis;
mod runtime;

pub use collector::CollectorConfig;
pub use database::DatabaseConfig;
pub use dispatcher::DispatcherConfig;
pub use error::{ConfigError, ValidationError};
pub use object_store::ObjectStoreConfig;
pub use redis::RedisConfig;
pub use runtime::{Environment, RuntimeConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables,
/// then hand each section to the component it configures.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Environment and logging
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (message sink)
    pub redis: RedisConfig,

    /// Event dispatcher loop
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Temp object collector loop
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Filesystem object store
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CATALOG` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CATALOG__DATABASE__URL=...` -> `database.url = ...`
    /// - `CATALOG__DISPATCHER__LEASE_SECS=300` -> `dispatcher.lease_secs = 300`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CATALOG")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.runtime.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.dispatcher.validate()?;
        self.collector.validate()?;
        self.object_store.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.runtime.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::FailurePolicy;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CATALOG__DATABASE__URL",
        "CATALOG__REDIS__URL",
        "CATALOG__RUNTIME__ENVIRONMENT",
        "CATALOG__DISPATCHER__LEASE_SECS",
        "CATALOG__DISPATCHER__INTERVAL_MS",
        "CATALOG__COLLECTOR__FAILURE_POLICY",
        "CATALOG__COLLECTOR__TTL_SECS",
    ];

    fn set_minimal_env() {
        env::set_var("CATALOG__DATABASE__URL", "postgresql://test@localhost/catalog");
        env::set_var("CATALOG__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/catalog");
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }

    #[test]
    fn test_defaults_validate() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatcher.interval(), Duration::from_secs(10));
        assert_eq!(config.collector.ttl(), Duration::from_secs(1800));
        assert!(!config.is_production());
    }

    #[test]
    fn test_loop_settings_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CATALOG__DISPATCHER__LEASE_SECS", "600");
        env::set_var("CATALOG__COLLECTOR__TTL_SECS", "60");
        env::set_var("CATALOG__COLLECTOR__FAILURE_POLICY", "commit_confirmed");
        env::set_var("CATALOG__RUNTIME__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.dispatcher.lease_secs, 600);
        assert_eq!(config.collector.ttl_secs, 60);
        assert_eq!(config.collector.failure_policy, FailurePolicy::CommitConfirmed);
        assert!(config.is_production());
    }

    #[test]
    fn test_short_lease_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CATALOG__DISPATCHER__INTERVAL_MS", "20000");
        env::set_var("CATALOG__DISPATCHER__LEASE_SECS", "15");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::LeaseNotLongerThanInterval { .. })
        ));
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("CATALOG__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
