//! Integration tests for the Transactional Outbox Pattern.
//!
//! These tests verify the end-to-end flow:
//! 1. The facade writes an item and its event in one transaction
//! 2. The dispatcher reserves due events under a lease and sends them
//! 3. Delivered events are marked done; failed ones come back after the lease
//!
//! Uses in-memory implementations to test the pattern without external dependencies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use catalog_outbox::adapters::memory::{InMemoryAdvisoryLocks, InMemoryDatabase, InMemoryMessageSink};
use catalog_outbox::adapters::{EventDispatcher, EventDispatcherConfig};
use catalog_outbox::application::OutboxFacade;
use catalog_outbox::domain::catalog::NewItem;
use catalog_outbox::domain::foundation::{BrandId, ErrorCode};
use catalog_outbox::domain::outbox::{
    CreateItemPayload, EventStatus, NewEvent, ReservationPolicy, EVENT_CREATE_ITEM,
};
use catalog_outbox::ports::{OutboxStore, TxContext};

// =============================================================================
// Test Infrastructure
// =============================================================================

const LEASE: Duration = Duration::from_secs(300);

struct Harness {
    db: InMemoryDatabase,
    locks: InMemoryAdvisoryLocks,
    sink: InMemoryMessageSink,
}

impl Harness {
    fn new() -> Self {
        Self {
            db: InMemoryDatabase::new().with_reservation(ReservationPolicy::new(LEASE, 100)),
            locks: InMemoryAdvisoryLocks::new(),
            sink: InMemoryMessageSink::new(),
        }
    }

    fn facade(&self) -> OutboxFacade {
        let db = Arc::new(self.db.clone());
        OutboxFacade::new(self.db.coordinator(), db.clone(), db.clone(), db.clone(), db)
    }

    fn dispatcher(&self) -> EventDispatcher {
        self.dispatcher_with(EventDispatcherConfig::default())
    }

    fn dispatcher_with(&self, config: EventDispatcherConfig) -> EventDispatcher {
        EventDispatcher::with_config(
            Arc::new(self.locks.clone()),
            Arc::new(self.db.clone()),
            Arc::new(self.sink.clone()),
            config,
        )
    }
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn created_item_is_delivered_exactly_once() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    assert_eq!(brand, BrandId::new(1));

    let item_id = h
        .facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();

    let events = h.db.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EVENT_CREATE_ITEM);
    assert_eq!(events[0].status, EventStatus::New);

    let payload: CreateItemPayload = serde_json::from_slice(&events[0].payload).unwrap();
    assert_eq!(payload.item_id, item_id);
    assert_eq!(payload.brand_name, "Acme");
    assert_eq!(payload.item_name, "Test");
    assert_eq!(payload.price, 100);

    let report = h.dispatcher().tick().await.unwrap();
    assert_eq!(report.delivered, vec![events[0].id]);

    let sent = h.sink.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event_type, EVENT_CREATE_ITEM);
    assert_eq!(sent[0].payload, events[0].payload);
    assert_eq!(h.db.event(events[0].id).await.unwrap().status, EventStatus::Done);

    // Nothing left to deliver, even after the lease would have expired.
    h.db.advance_clock(LEASE * 2);
    assert!(h.dispatcher().tick().await.unwrap().is_empty());
    assert_eq!(h.sink.sent().await.len(), 1);
}

#[tokio::test]
async fn running_dispatcher_delivers_until_shutdown() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    let facade = h.facade();
    for name in ["Shirt", "Socks", "Hat"] {
        facade
            .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, name, 10))
            .await
            .unwrap();
    }

    let dispatcher = h.dispatcher_with(EventDispatcherConfig::default().with_interval(Duration::from_millis(10)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(h.sink.sent().await.len(), 3);
    assert!(h
        .db
        .events()
        .await
        .iter()
        .all(|e| e.status == EventStatus::Done));
}

// =============================================================================
// Atomicity
// =============================================================================

#[tokio::test]
async fn failed_business_write_leaves_no_event() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.db.fail_item_inserts(true);

    let result = h
        .facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await;

    assert!(result.is_err());
    assert!(h.db.events().await.is_empty());
    assert!(h.db.items().await.is_empty());
}

#[tokio::test]
async fn failed_event_insert_rolls_back_business_write() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.db.fail_event_inserts(true);

    let err = h
        .facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::DatabaseError);
    assert!(h.db.items().await.is_empty());
    assert_eq!(h.db.rollbacks(), 1);
}

#[tokio::test]
async fn unknown_brand_writes_nothing() {
    let h = Harness::new();

    let err = h
        .facade()
        .create_item_with_notification(
            &mut TxContext::new(),
            NewItem::new(BrandId::new(42), "Test", 100),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::BrandNotFound);
    assert_eq!(h.db.transactions_begun(), 0);
    assert!(h.db.items().await.is_empty());
    assert!(h.db.events().await.is_empty());
}

#[tokio::test]
async fn event_insert_outside_transaction_is_a_programmer_error() {
    let h = Harness::new();

    let err = h
        .db
        .create_event(
            &mut TxContext::new(),
            NewEvent::new(EVENT_CREATE_ITEM, Vec::new()),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::NoTransaction);
}

// =============================================================================
// Reservation
// =============================================================================

#[tokio::test]
async fn back_to_back_fetches_never_share_an_event() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();

    let first = h.db.fetch_and_reserve(&mut TxContext::new()).await.unwrap();
    let second = h.db.fetch_and_reserve(&mut TxContext::new()).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[tokio::test]
async fn expired_lease_makes_event_fetchable_again() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();

    let first = h.db.fetch_and_reserve(&mut TxContext::new()).await.unwrap();
    h.db.advance_clock(LEASE + Duration::from_secs(1));
    let again = h.db.fetch_and_reserve(&mut TxContext::new()).await.unwrap();

    assert_eq!(first[0].id, again[0].id);
}

#[tokio::test]
async fn marking_done_twice_changes_nothing() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();
    let id = h.db.events().await[0].id;

    h.db.mark_done(&mut TxContext::new(), &[id]).await.unwrap();
    let once = h.db.events().await;
    h.db.mark_done(&mut TxContext::new(), &[id]).await.unwrap();

    assert_eq!(h.db.events().await, once);
}

#[tokio::test]
async fn rejected_send_is_redelivered_after_lease() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();
    h.sink.fail_event_type(EVENT_CREATE_ITEM).await;
    let dispatcher = h.dispatcher();

    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.failed.len(), 1);

    h.sink.heal().await;
    assert!(dispatcher.tick().await.unwrap().is_empty());

    h.db.advance_clock(LEASE + Duration::from_secs(1));
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.delivered.len(), 1);
    assert_eq!(h.sink.sent().await.len(), 1);
}

#[tokio::test]
async fn dispatcher_delivers_when_the_lock_is_unavailable() {
    let h = Harness::new();
    let brand = h.db.seed_brand("Acme").await;
    h.facade()
        .create_item_with_notification(&mut TxContext::new(), NewItem::new(brand, "Test", 100))
        .await
        .unwrap();
    h.locks.fail_acquire(true);

    let report = h.dispatcher().tick().await.unwrap();

    assert_eq!(report.delivered.len(), 1);
    assert_eq!(h.sink.sent().await.len(), 1);
}
