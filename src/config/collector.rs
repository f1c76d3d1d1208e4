//! Temp object collector configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::TempObjectCollectorConfig;
use crate::domain::storage::FailurePolicy;

/// Temp object collector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Tick interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Age in seconds an upload must exceed to be collected
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Wall-clock bound of one tick in seconds
    #[serde(default = "default_tick_timeout_secs")]
    pub tick_timeout_secs: u64,

    /// Handling of a batch after a failed store delete
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_secs(self.tick_timeout_secs)
    }

    /// Loop settings for the collector
    pub fn loop_config(&self) -> TempObjectCollectorConfig {
        TempObjectCollectorConfig::default()
            .with_interval(self.interval())
            .with_ttl(self.ttl())
            .with_tick_timeout(self.tick_timeout())
            .with_failure_policy(self.failure_policy)
    }

    /// Validate collector configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_ms == 0 {
            return Err(ValidationError::ZeroValue("collector.interval_ms"));
        }
        if self.ttl_secs == 0 {
            return Err(ValidationError::ZeroValue("collector.ttl_secs"));
        }
        if self.tick_timeout_secs == 0 {
            return Err(ValidationError::ZeroValue("collector.tick_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            ttl_secs: default_ttl_secs(),
            tick_timeout_secs: default_tick_timeout_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_tick_timeout_secs() -> u64 {
    120
}
