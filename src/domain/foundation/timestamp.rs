//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp shifted forward by a std duration.
    ///
    /// Saturates at the chrono maximum instead of overflowing.
    pub fn plus(&self, by: std::time::Duration) -> Self {
        let delta = Duration::from_std(by).unwrap_or(Duration::MAX);
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Creates a new timestamp shifted backward by a std duration.
    pub fn minus(&self, by: std::time::Duration) -> Self {
        let delta = Duration::from_std(by).unwrap_or(Duration::MAX);
        Self(self.0.checked_sub_signed(delta).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        self.plus(std::time::Duration::from_secs(secs))
    }

    /// Creates a new timestamp by subtracting the specified number of seconds.
    pub fn minus_secs(&self, secs: u64) -> Self {
        self.minus(std::time::Duration::from_secs(secs))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
