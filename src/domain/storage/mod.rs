//! Temporary objects - uploads not yet attached to any item.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{TempObjectId, Timestamp};

/// A row of the temporary object index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempObject {
    pub id: TempObjectId,
    pub object_key: String,
    pub uploaded_at: Timestamp,
}

impl TempObject {
    /// Age at `now`; negative when the upload clock ran ahead.
    pub fn age(&self, now: &Timestamp) -> chrono::Duration {
        now.duration_since(&self.uploaded_at)
    }

    /// Collectable iff strictly older than `ttl`.
    pub fn is_expired(&self, now: &Timestamp, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.age(now) > ttl,
            Err(_) => false,
        }
    }
}

/// Splits index rows into (expired, still young), keeping input order.
pub fn partition_expired(
    objects: Vec<TempObject>,
    now: &Timestamp,
    ttl: Duration,
) -> (Vec<TempObject>, Vec<TempObject>) {
    objects.into_iter().partition(|o| o.is_expired(now, ttl))
}

/// What the collector does with the rest of a batch once one store delete fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop and delete no index rows in this run.
    #[default]
    AbortBatch,
    /// Stop, but drop index rows for objects already confirmed gone.
    CommitConfirmed,
}
