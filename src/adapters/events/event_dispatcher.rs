//! EventDispatcher - background delivery of outbox events.
//!
//! This service implements the second half of the Transactional Outbox Pattern:
//! 1. The write path inserts events in the same transaction as the business write
//! 2. **EventDispatcher reserves due events and hands them to the message sink** ← This module
//!
//! ## Tick
//!
//! 1. Take the outbox advisory lock (on failure, log and go on without it)
//! 2. Reserve a batch of due events under a lease
//! 3. Release the lock; the reservation is already durable
//! 4. Send each event, skipping failures (they come back when the lease runs out)
//! 5. Mark the delivered events done in one call
//!
//! Delivery is at-least-once: consumers must tolerate duplicates.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 10s | Time between ticks |
//! | `tick_timeout` | 60s | Wall-clock bound of a single tick |
//!
//! The lease and batch size belong to the outbox store's `ReservationPolicy`.
//! The lease must be longer than `interval`.
//!
//! ## Shutdown
//!
//! The loop stops as soon as the shutdown signal flips. No final batch is
//! dispatched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::foundation::{DomainError, EventId};
use crate::domain::lock::AdvisoryLockId;
use crate::ports::{AdvisoryLockService, MessageSink, OutboxStore, TxContext};

/// Configuration for the EventDispatcher loop.
#[derive(Debug, Clone)]
pub struct EventDispatcherConfig {
    /// Time between ticks.
    pub interval: Duration,

    /// Maximum duration of one tick.
    pub tick_timeout: Duration,
}

impl Default for EventDispatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            tick_timeout: Duration::from_secs(60),
        }
    }
}

impl EventDispatcherConfig {
    /// Create config with custom tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Create config with custom tick timeout.
    pub fn with_tick_timeout(mut self, timeout: Duration) -> Self {
        self.tick_timeout = timeout;
        self
    }
}

/// Outcome of one dispatch tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events reserved by this tick.
    pub reserved: usize,
    /// Events accepted by the sink and marked done.
    pub delivered: Vec<EventId>,
    /// Events the sink rejected; they stay reserved until the lease expires.
    pub failed: Vec<EventId>,
}

impl DispatchReport {
    /// True when nothing was due.
    pub fn is_empty(&self) -> bool {
        self.reserved == 0
    }
}

/// Background service that delivers outbox events to a message sink.
pub struct EventDispatcher {
    locks: Arc<dyn AdvisoryLockService>,
    outbox: Arc<dyn OutboxStore>,
    sink: Arc<dyn MessageSink>,
    config: EventDispatcherConfig,
}

impl EventDispatcher {
    /// Create a new EventDispatcher with default configuration.
    pub fn new(
        locks: Arc<dyn AdvisoryLockService>,
        outbox: Arc<dyn OutboxStore>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self::with_config(locks, outbox, sink, EventDispatcherConfig::default())
    }

    /// Create a new EventDispatcher with custom configuration.
    pub fn with_config(
        locks: Arc<dyn AdvisoryLockService>,
        outbox: Arc<dyn OutboxStore>,
        sink: Arc<dyn MessageSink>,
        config: EventDispatcherConfig,
    ) -> Self {
        Self {
            locks,
            outbox,
            sink,
            config,
        }
    }

    /// Run ticks until the shutdown signal is received.
    ///
    /// Tick failures are logged and never end the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.config.interval.as_millis() as u64, "Event dispatcher started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Event dispatcher stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    match time::timeout(self.config.tick_timeout, self.tick()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Dispatch tick failed"),
                        Err(_) => tracing::warn!(
                            timeout_ms = self.config.tick_timeout.as_millis() as u64,
                            "Dispatch tick timed out"
                        ),
                    }
                }
            }
        }
    }

    /// Run exactly one tick.
    ///
    /// # Errors
    ///
    /// Fails when reserving or marking done fails. Send failures are not
    /// errors; they are reported in [`DispatchReport::failed`].
    pub async fn tick(&self) -> Result<DispatchReport, DomainError> {
        let lock = match self.locks.acquire(AdvisoryLockId::OUTBOX_DISPATCH).await {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!(
                    lock_id = %AdvisoryLockId::OUTBOX_DISPATCH,
                    error = %e,
                    "Failed to acquire outbox lock, reserving without it"
                );
                None
            }
        };

        let reserved = self.outbox.fetch_and_reserve(&mut TxContext::new()).await;

        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                tracing::warn!(lock_id = %AdvisoryLockId::OUTBOX_DISPATCH, error = %e, "Failed to release outbox lock");
            }
        }

        let events = reserved?;
        if events.is_empty() {
            tracing::debug!("No outbox events due");
            return Ok(DispatchReport::default());
        }

        let mut report = DispatchReport {
            reserved: events.len(),
            ..DispatchReport::default()
        };

        for event in &events {
            match self.sink.send(&event.event_type, &event.payload).await {
                Ok(()) => report.delivered.push(event.id),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        error = %e,
                        "Failed to send outbox event, retrying after lease expiry"
                    );
                    report.failed.push(event.id);
                }
            }
        }

        if !report.delivered.is_empty() {
            self.outbox
                .mark_done(&mut TxContext::new(), &report.delivered)
                .await?;
        }

        tracing::info!(
            count = report.reserved,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Outbox batch dispatched"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAdvisoryLocks, InMemoryDatabase, InMemoryMessageSink};
    use crate::domain::outbox::{EventStatus, NewEvent, ReservationPolicy, EVENT_CREATE_ITEM};

    const LEASE: Duration = Duration::from_secs(300);

    struct Fixture {
        db: InMemoryDatabase,
        locks: InMemoryAdvisoryLocks,
        sink: InMemoryMessageSink,
        dispatcher: EventDispatcher,
    }

    fn fixture() -> Fixture {
        let db = InMemoryDatabase::new().with_reservation(ReservationPolicy::new(LEASE, 100));
        let locks = InMemoryAdvisoryLocks::new();
        let sink = InMemoryMessageSink::new();
        let dispatcher = EventDispatcher::new(
            Arc::new(locks.clone()),
            Arc::new(db.clone()),
            Arc::new(sink.clone()),
        );
        Fixture {
            db,
            locks,
            sink,
            dispatcher,
        }
    }

    fn event(payload: &str) -> NewEvent {
        NewEvent::new(EVENT_CREATE_ITEM, payload.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn tick_delivers_and_marks_done() {
        let f = fixture();
        let first = f.db.seed_event(event("a")).await;
        let second = f.db.seed_event(event("b")).await;

        let report = f.dispatcher.tick().await.unwrap();

        assert_eq!(report.reserved, 2);
        assert_eq!(report.delivered, vec![first, second]);
        assert_eq!(f.sink.sent().await.len(), 2);
        assert_eq!(f.db.event(first).await.unwrap().status, EventStatus::Done);
        assert_eq!(f.db.event(second).await.unwrap().status, EventStatus::Done);
    }

    #[tokio::test]
    async fn empty_outbox_is_not_an_error() {
        let f = fixture();

        let report = f.dispatcher.tick().await.unwrap();

        assert!(report.is_empty());
        assert_eq!(f.sink.attempts().await, 0);
        assert_eq!(f.locks.released(), 1);
    }

    #[tokio::test]
    async fn failed_send_is_skipped_and_redelivered_after_lease() {
        let f = fixture();
        let good = f.db.seed_event(event("good")).await;
        let bad = f.db.seed_event(event("bad")).await;
        f.sink.fail_payload(b"bad").await;

        let report = f.dispatcher.tick().await.unwrap();
        assert_eq!(report.delivered, vec![good]);
        assert_eq!(report.failed, vec![bad]);
        assert_eq!(f.db.event(bad).await.unwrap().status, EventStatus::New);

        // Still leased: the next tick finds nothing.
        f.sink.heal().await;
        assert!(f.dispatcher.tick().await.unwrap().is_empty());

        f.db.advance_clock(LEASE + Duration::from_secs(1));
        let report = f.dispatcher.tick().await.unwrap();
        assert_eq!(report.delivered, vec![bad]);
        assert_eq!(f.db.event(bad).await.unwrap().status, EventStatus::Done);
    }

    #[tokio::test]
    async fn lock_failure_does_not_stop_dispatch() {
        let f = fixture();
        f.locks.fail_acquire(true);
        f.db.seed_event(event("a")).await;

        let report = f.dispatcher.tick().await.unwrap();

        assert_eq!(report.delivered.len(), 1);
        assert_eq!(f.locks.released(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_ends_tick_and_still_releases_lock() {
        let f = fixture();
        f.db.seed_event(event("a")).await;
        f.db.fail_fetches(true);

        assert!(f.dispatcher.tick().await.is_err());
        assert_eq!(f.sink.attempts().await, 0);
        assert_eq!(f.locks.released(), 1);
        assert!(!f.locks.is_held(AdvisoryLockId::OUTBOX_DISPATCH).await);
    }

    #[tokio::test]
    async fn lock_is_not_held_while_sending() {
        let f = fixture();
        f.db.seed_event(event("a")).await;

        f.dispatcher.tick().await.unwrap();

        assert_eq!(f.locks.acquired(), 1);
        assert_eq!(f.locks.released(), 1);
    }

    #[tokio::test]
    async fn mark_done_failure_leaves_events_for_redelivery() {
        let f = fixture();
        let id = f.db.seed_event(event("a")).await;
        f.db.fail_mark_done(true);

        assert!(f.dispatcher.tick().await.is_err());
        assert_eq!(f.db.event(id).await.unwrap().status, EventStatus::New);

        f.db.fail_mark_done(false);
        f.db.advance_clock(LEASE + Duration::from_secs(1));
        f.dispatcher.tick().await.unwrap();

        // Delivered twice: at-least-once.
        assert_eq!(f.sink.sent().await.len(), 2);
        assert_eq!(f.db.event(id).await.unwrap().status, EventStatus::Done);
    }

    #[tokio::test]
    async fn concurrent_ticks_never_send_an_event_twice() {
        let f = fixture();
        for i in 0..20 {
            f.db.seed_event(event(&format!("e{}", i))).await;
        }
        let other = EventDispatcher::new(
            Arc::new(f.locks.clone()),
            Arc::new(f.db.clone()),
            Arc::new(f.sink.clone()),
        );

        let (a, b) = tokio::join!(f.dispatcher.tick(), other.tick());

        assert_eq!(a.unwrap().reserved + b.unwrap().reserved, 20);
        let mut payloads: Vec<_> = f.sink.sent().await.into_iter().map(|m| m.payload).collect();
        payloads.sort();
        payloads.dedup();
        assert_eq!(payloads.len(), 20);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let f = fixture();
        f.db.seed_event(event("a")).await;

        let config = EventDispatcherConfig::default().with_interval(Duration::from_millis(10));
        let dispatcher = EventDispatcher::with_config(
            Arc::new(f.locks.clone()),
            Arc::new(f.db.clone()),
            Arc::new(f.sink.clone()),
            config,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        handle.await.unwrap();
        assert_eq!(f.sink.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn config_defaults_are_reasonable() {
        let config = EventDispatcherConfig::default();

        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.tick_timeout, Duration::from_secs(60));
    }
}
