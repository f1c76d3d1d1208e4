//! OutboxStore port - persistence of outbox events.
//!
//! Implements the storage half of the Transactional Outbox Pattern:
//!
//! 1. The write path inserts a NEW event in the same transaction as the
//!    business write (`create_event`)
//! 2. The dispatcher claims due events with a time-bounded lease
//!    (`fetch_and_reserve`)
//! 3. Delivered events are marked DONE (`mark_done`)
//!
//! A lease is not a lock: if the dispatcher dies mid-send the lease runs out
//! and the event is fetched again. Delivery is therefore at-least-once.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventId};
use crate::domain::outbox::{Event, NewEvent};
use crate::ports::TxContext;

/// Port for the outbox event table.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Insert a NEW event.
    ///
    /// Never opens a transaction of its own: fails with `NoTransaction` unless
    /// the caller's business write transaction is in `ctx`.
    async fn create_event(&self, ctx: &mut TxContext, event: NewEvent) -> Result<EventId, DomainError>;

    /// Select eligible events and lease them, in one transaction.
    ///
    /// Eligible means status NEW and no live lease. Two calls never return the
    /// same event while its lease is live, with or without the advisory lock.
    /// Returns an empty list when nothing is due.
    async fn fetch_and_reserve(&self, ctx: &mut TxContext) -> Result<Vec<Event>, DomainError>;

    /// Mark events DONE. Already-done ids are left untouched.
    async fn mark_done(&self, ctx: &mut TxContext, ids: &[EventId]) -> Result<(), DomainError>;
}
