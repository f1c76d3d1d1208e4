//! TempObjectCollector - garbage collection of abandoned uploads.
//!
//! Uploads that were never attached to an item stay in the temporary object
//! index. Once strictly older than the TTL they are deleted from the object
//! store, then from the index.
//!
//! ## Tick
//!
//! 1. Take the temp-object advisory lock (on failure, log and go on without it)
//! 2. In one transaction, lock the index rows past the TTL cutoff, skipping
//!    rows another transaction holds
//! 3. Delete each expired object from the store, stopping at the first failure
//! 4. Remove the index rows the failure policy allows
//! 5. Release the lock, whatever happened in between
//!
//! A missing object counts as deleted, so a run after a partial failure
//! retries exactly the remaining rows without tripping over objects an
//! earlier run already removed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::TransactionCoordinator;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::lock::AdvisoryLockId;
use crate::domain::storage::{partition_expired, FailurePolicy};
use crate::ports::{AdvisoryLockService, ObjectStore, TempObjectIndex, TxContext};

/// Configuration for the TempObjectCollector loop.
#[derive(Debug, Clone)]
pub struct TempObjectCollectorConfig {
    /// Time between ticks.
    pub interval: Duration,

    /// Age an upload must exceed before it is collected.
    pub ttl: Duration,

    /// Maximum duration of one tick.
    pub tick_timeout: Duration,

    /// What happens to the rest of a batch after a failed delete.
    pub failure_policy: FailurePolicy,
}

impl Default for TempObjectCollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            ttl: Duration::from_secs(30 * 60),
            tick_timeout: Duration::from_secs(120),
            failure_policy: FailurePolicy::AbortBatch,
        }
    }
}

impl TempObjectCollectorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tick_timeout(mut self, timeout: Duration) -> Self {
        self.tick_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Result of one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// No upload was old enough.
    NothingToCollect,

    /// Every expired upload was removed.
    Collected {
        /// Objects removed from the store and the index.
        removed: usize,
    },

    /// A store delete failed and the run stopped there.
    Aborted {
        /// Key whose delete failed.
        failed_key: String,
        /// Objects confirmed gone before the failure.
        objects_removed: usize,
        /// Index rows removed, zero under `AbortBatch`.
        rows_removed: u64,
    },
}

/// Background service that collects expired temporary uploads.
pub struct TempObjectCollector {
    locks: Arc<dyn AdvisoryLockService>,
    coordinator: TransactionCoordinator,
    index: Arc<dyn TempObjectIndex>,
    store: Arc<dyn ObjectStore>,
    config: TempObjectCollectorConfig,
}

impl TempObjectCollector {
    pub fn new(
        locks: Arc<dyn AdvisoryLockService>,
        coordinator: TransactionCoordinator,
        index: Arc<dyn TempObjectIndex>,
        store: Arc<dyn ObjectStore>,
        config: TempObjectCollectorConfig,
    ) -> Self {
        Self {
            locks,
            coordinator,
            index,
            store,
            config,
        }
    }

    /// Run collections until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            ttl_secs = self.config.ttl.as_secs(),
            "Temp object collector started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Temp object collector stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    match time::timeout(self.config.tick_timeout, self.collect_once()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Temp object collection failed"),
                        Err(_) => tracing::warn!(
                            timeout_ms = self.config.tick_timeout.as_millis() as u64,
                            "Temp object collection timed out"
                        ),
                    }
                }
            }
        }
    }

    /// Run one collection.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be read or updated. A failed store delete
    /// is reported as [`CollectOutcome::Aborted`], not as an error.
    pub async fn collect_once(&self) -> Result<CollectOutcome, DomainError> {
        let lock = match self.locks.acquire(AdvisoryLockId::TEMP_OBJECT_GC).await {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!(
                    lock_id = %AdvisoryLockId::TEMP_OBJECT_GC,
                    error = %e,
                    "Failed to acquire temp object lock, collecting without it"
                );
                None
            }
        };

        let outcome = self.sweep().await;

        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                tracing::warn!(lock_id = %AdvisoryLockId::TEMP_OBJECT_GC, error = %e, "Failed to release temp object lock");
            }
        }

        match &outcome {
            Ok(CollectOutcome::NothingToCollect) => {
                tracing::debug!("No temporary objects to collect");
            }
            Ok(CollectOutcome::Collected { removed }) => {
                tracing::info!(count = removed, "Temporary objects collected");
            }
            Ok(CollectOutcome::Aborted {
                failed_key,
                objects_removed,
                rows_removed,
            }) => {
                tracing::warn!(
                    object_key = %failed_key,
                    objects_removed,
                    rows_removed,
                    "Temporary object collection stopped at a failed delete"
                );
            }
            Err(_) => {}
        }

        outcome
    }

    async fn sweep(&self) -> Result<CollectOutcome, DomainError> {
        let index = Arc::clone(&self.index);
        let store = Arc::clone(&self.store);
        let ttl = self.config.ttl;
        let policy = self.config.failure_policy;

        self.coordinator
            .run_in_transaction(&mut TxContext::new(), move |tx| {
                Box::pin(async move {
                    let now = Timestamp::now();
                    let rows = index.list_expired_for_update(tx, now.minus(ttl)).await?;
                    let (expired, _) = partition_expired(rows, &now, ttl);

                    if expired.is_empty() {
                        return Ok(CollectOutcome::NothingToCollect);
                    }

                    let mut confirmed = Vec::with_capacity(expired.len());
                    let mut failed_key = None;

                    for object in &expired {
                        match store.delete(&object.object_key).await {
                            Ok(()) => confirmed.push(object.id),
                            Err(e) if e.is_not_found() => confirmed.push(object.id),
                            Err(e) => {
                                tracing::warn!(
                                    object_key = %object.object_key,
                                    error = %e,
                                    "Failed to delete temporary object"
                                );
                                failed_key = Some(object.object_key.clone());
                                break;
                            }
                        }
                    }

                    match failed_key {
                        None => {
                            index.delete_by_ids(tx, &confirmed).await?;
                            Ok(CollectOutcome::Collected {
                                removed: confirmed.len(),
                            })
                        }
                        Some(failed_key) => {
                            let rows_removed = match policy {
                                FailurePolicy::AbortBatch => 0,
                                FailurePolicy::CommitConfirmed if confirmed.is_empty() => 0,
                                FailurePolicy::CommitConfirmed => {
                                    index.delete_by_ids(tx, &confirmed).await?
                                }
                            };
                            Ok(CollectOutcome::Aborted {
                                failed_key,
                                objects_removed: confirmed.len(),
                                rows_removed,
                            })
                        }
                    }
                })
            })
            .await
    }
}
