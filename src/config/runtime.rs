//! Runtime configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Process-wide runtime settings
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Environment name
    #[serde(default)]
    pub environment: Environment,

    /// Log filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Application environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeConfig {
    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Validate runtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.log_level.trim().is_empty() {
            return Err(ValidationError::InvalidLogLevel(self.log_level.clone()));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info,catalog_outbox=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_development() {
        let config = RuntimeConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_log_level_is_rejected() {
        let config = RuntimeConfig {
            log_level: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
