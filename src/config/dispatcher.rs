//! Event dispatcher configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::EventDispatcherConfig;
use crate::domain::outbox::ReservationPolicy;

/// Event dispatcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Tick interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Reservation lease in seconds
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Maximum events reserved per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Wall-clock bound of one tick in seconds
    #[serde(default = "default_tick_timeout_secs")]
    pub tick_timeout_secs: u64,
}

impl DispatcherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn tick_timeout(&self) -> Duration {
        Duration::from_secs(self.tick_timeout_secs)
    }

    /// Reservation policy for the outbox store
    pub fn reservation_policy(&self) -> ReservationPolicy {
        ReservationPolicy::new(self.lease(), self.batch_size)
    }

    /// Loop settings for the dispatcher
    pub fn loop_config(&self) -> EventDispatcherConfig {
        EventDispatcherConfig::default()
            .with_interval(self.interval())
            .with_tick_timeout(self.tick_timeout())
    }

    /// Validate dispatcher configuration
    ///
    /// The lease must outlast both the interval and the tick timeout, or a
    /// later tick could re-send an event whose delivery is still in flight.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_ms == 0 {
            return Err(ValidationError::ZeroValue("dispatcher.interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::ZeroValue("dispatcher.batch_size"));
        }
        if self.tick_timeout_secs == 0 {
            return Err(ValidationError::ZeroValue("dispatcher.tick_timeout_secs"));
        }
        if self.lease() <= self.interval() {
            return Err(ValidationError::LeaseNotLongerThanInterval {
                lease_secs: self.lease_secs,
                interval_ms: self.interval_ms,
            });
        }
        if self.lease() <= self.tick_timeout() {
            return Err(ValidationError::LeaseNotLongerThanTickTimeout {
                lease_secs: self.lease_secs,
                tick_timeout_secs: self.tick_timeout_secs,
            });
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            lease_secs: default_lease_secs(),
            batch_size: default_batch_size(),
            tick_timeout_secs: default_tick_timeout_secs(),
        }
    }
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_lease_secs() -> u64 {
    300
}

fn default_batch_size() -> u32 {
    100
}

fn default_tick_timeout_secs() -> u64 {
    60
}
