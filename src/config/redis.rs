//! Redis configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Redis configuration for the message sink
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Prepended to the event type to form the pub/sub channel
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
}

impl RedisConfig {
    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel_prefix: default_channel_prefix(),
        }
    }
}

fn default_channel_prefix() -> String {
    "catalog.".to_string()
}
