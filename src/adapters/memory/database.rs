//! In-memory database - every storage port over one shared state.
//!
//! A transaction holds the state mutex for its whole lifetime and works on a
//! private copy, which is written back on commit and discarded on rollback or
//! drop. Transactions are therefore fully serialized, which is stronger than
//! what PostgreSQL gives the real stores but preserves every property the
//! callers rely on.
//!
//! Failure injection and a controllable clock let tests drive the error and
//! lease-expiry paths.

use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::TransactionCoordinator;
use crate::domain::catalog::{Brand, Item, NewItem};
use crate::domain::foundation::{
    BrandId, DomainError, ErrorCode, EventId, ItemId, TempObjectId, Timestamp,
};
use crate::domain::outbox::{Event, EventStatus, NewEvent, ReservationPolicy};
use crate::domain::storage::TempObject;
use crate::ports::{
    BrandReader, ItemRepository, OutboxStore, TempObjectIndex, Transaction, TransactionProvider,
    TxContext,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    brands: BTreeMap<BrandId, Brand>,
    items: BTreeMap<ItemId, Item>,
    item_images: Vec<(ItemId, String)>,
    events: BTreeMap<EventId, Event>,
    temp_objects: BTreeMap<TempObjectId, TempObject>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct Controls {
    fail_event_inserts: AtomicBool,
    fail_item_inserts: AtomicBool,
    fail_temp_inserts: AtomicBool,
    fail_temp_deletes: AtomicBool,
    fail_mark_done: AtomicBool,
    fail_fetches: AtomicBool,
    clock_offset_secs: AtomicU64,
    transactions_begun: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Controls {
    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<(), DomainError> {
        if flag.load(Ordering::SeqCst) {
            return Err(DomainError::database(operation, "injected failure"));
        }
        Ok(())
    }

    fn now(&self) -> Timestamp {
        Timestamp::now().plus_secs(self.clock_offset_secs.load(Ordering::SeqCst))
    }
}

/// Transaction over [`InMemoryDatabase`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    controls: Arc<Controls>,
}

#[async_trait]
impl Transaction for InMemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let InMemoryTx {
            mut guard,
            working,
            controls,
        } = *self;
        *guard = working;
        controls.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.controls.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn state<'a>(ctx: &'a mut TxContext, operation: &str) -> Result<&'a mut MemoryState, DomainError> {
    Ok(&mut ctx.transaction::<InMemoryTx>(operation)?.working)
}

/// In-memory implementation of the transaction, outbox, temp index and
/// catalog ports.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    controls: Arc<Controls>,
    policy: ReservationPolicy,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            controls: Arc::new(Controls::default()),
            policy: ReservationPolicy::default(),
        }
    }

    /// A handle on the same state that reserves with `policy`.
    pub fn with_reservation(&self, policy: ReservationPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    /// Coordinator opening transactions on this database.
    pub fn coordinator(&self) -> TransactionCoordinator {
        TransactionCoordinator::new(Arc::new(self.clone()))
    }

    // ════════════════════════════════════════════════════════════════════
    // Test controls
    // ════════════════════════════════════════════════════════════════════

    pub fn fail_event_inserts(&self, fail: bool) {
        self.controls.fail_event_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_item_inserts(&self, fail: bool) {
        self.controls.fail_item_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_temp_inserts(&self, fail: bool) {
        self.controls.fail_temp_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_temp_deletes(&self, fail: bool) {
        self.controls.fail_temp_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_done(&self, fail: bool) {
        self.controls.fail_mark_done.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.controls.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Moves this database's clock forward.
    pub fn advance_clock(&self, by: Duration) {
        self.controls
            .clock_offset_secs
            .fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// Current time as seen by the stores.
    pub fn now(&self) -> Timestamp {
        self.controls.now()
    }

    pub fn transactions_begun(&self) -> usize {
        self.controls.transactions_begun.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.controls.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.controls.rollbacks.load(Ordering::SeqCst)
    }

    // ════════════════════════════════════════════════════════════════════
    // Seeding and inspection
    // ════════════════════════════════════════════════════════════════════

    pub async fn seed_brand(&self, name: &str) -> BrandId {
        let mut state = self.state.lock().await;
        let id = BrandId::new(state.next_id());
        state.brands.insert(
            id,
            Brand {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    pub async fn seed_event(&self, event: NewEvent) -> EventId {
        let now = self.now();
        let mut state = self.state.lock().await;
        insert_event(&mut state, event, now)
    }

    pub async fn seed_temp_object(&self, key: &str, uploaded_at: Timestamp) -> TempObjectId {
        let mut state = self.state.lock().await;
        let id = TempObjectId::new(state.next_id());
        state.temp_objects.insert(
            id,
            TempObject {
                id,
                object_key: key.to_string(),
                uploaded_at,
            },
        );
        id
    }

    pub async fn events(&self) -> Vec<Event> {
        self.state.lock().await.events.values().cloned().collect()
    }

    pub async fn event(&self, id: EventId) -> Option<Event> {
        self.state.lock().await.events.get(&id).cloned()
    }

    pub async fn items(&self) -> Vec<Item> {
        self.state.lock().await.items.values().cloned().collect()
    }

    pub async fn item_images(&self, item_id: ItemId) -> Vec<String> {
        self.state
            .lock()
            .await
            .item_images
            .iter()
            .filter(|(id, _)| *id == item_id)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub async fn temp_objects(&self) -> Vec<TempObject> {
        self.state.lock().await.temp_objects.values().cloned().collect()
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_event(state: &mut MemoryState, event: NewEvent, now: Timestamp) -> EventId {
    let id = EventId::new(state.next_id());
    state.events.insert(
        id,
        Event {
            id,
            event_type: event.event_type,
            payload: event.payload,
            status: EventStatus::New,
            created_at: now,
            reserved_until: None,
        },
    );
    id
}

#[async_trait]
impl TransactionProvider for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        self.controls.transactions_begun.fetch_add(1, Ordering::SeqCst);
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            working,
            controls: Arc::clone(&self.controls),
        }))
    }
}

#[async_trait]
impl OutboxStore for InMemoryDatabase {
    async fn create_event(&self, ctx: &mut TxContext, event: NewEvent) -> Result<EventId, DomainError> {
        let now = self.now();
        let state = state(ctx, "outbox.create_event")?;
        self.controls
            .check(&self.controls.fail_event_inserts, "outbox.create_event")?;
        Ok(insert_event(state, event, now))
    }

    async fn fetch_and_reserve(&self, ctx: &mut TxContext) -> Result<Vec<Event>, DomainError> {
        let now = self.now();
        let policy = self.policy;
        let controls = Arc::clone(&self.controls);

        self.coordinator()
            .run_in_transaction(ctx, move |tx| {
                Box::pin(async move {
                    let state = state(tx, "outbox.fetch_and_reserve")?;
                    controls.check(&controls.fail_fetches, "outbox.fetch_and_reserve")?;
                    let until = policy.reserved_until(&now);

                    let reserved = state
                        .events
                        .values_mut()
                        .filter(|e| e.is_eligible(&now))
                        .take(policy.batch_size as usize)
                        .map(|e| {
                            e.reserve(until);
                            e.clone()
                        })
                        .collect();

                    Ok(reserved)
                })
            })
            .await
    }

    async fn mark_done(&self, ctx: &mut TxContext, ids: &[EventId]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        let controls = Arc::clone(&self.controls);

        self.coordinator()
            .run_in_transaction(ctx, move |tx| {
                Box::pin(async move {
                    let state = state(tx, "outbox.mark_done")?;
                    controls.check(&controls.fail_mark_done, "outbox.mark_done")?;
                    for id in &ids {
                        if let Some(event) = state.events.get_mut(id) {
                            event.mark_done();
                        }
                    }
                    Ok(())
                })
            })
            .await
    }
}

#[async_trait]
impl TempObjectIndex for InMemoryDatabase {
    async fn insert(
        &self,
        ctx: &mut TxContext,
        object_key: &str,
        uploaded_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let state = state(ctx, "temp_objects.insert")?;
        self.controls
            .check(&self.controls.fail_temp_inserts, "temp_objects.insert")?;

        if state.temp_objects.values().any(|o| o.object_key == object_key) {
            return Ok(false);
        }
        let id = TempObjectId::new(state.next_id());
        state.temp_objects.insert(
            id,
            TempObject {
                id,
                object_key: object_key.to_string(),
                uploaded_at,
            },
        );
        Ok(true)
    }

    async fn list_expired_for_update(
        &self,
        ctx: &mut TxContext,
        cutoff: Timestamp,
    ) -> Result<Vec<TempObject>, DomainError> {
        let state = state(ctx, "temp_objects.list_expired_for_update")?;
        Ok(state
            .temp_objects
            .values()
            .filter(|o| o.uploaded_at.is_before(&cutoff))
            .cloned()
            .collect())
    }

    async fn delete_by_ids(&self, ctx: &mut TxContext, ids: &[TempObjectId]) -> Result<u64, DomainError> {
        let state = state(ctx, "temp_objects.delete_by_ids")?;
        self.controls
            .check(&self.controls.fail_temp_deletes, "temp_objects.delete_by_ids")?;

        let removed = ids
            .iter()
            .filter(|id| state.temp_objects.remove(*id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn delete_by_keys(&self, ctx: &mut TxContext, keys: &[String]) -> Result<u64, DomainError> {
        let state = state(ctx, "temp_objects.delete_by_keys")?;
        let before = state.temp_objects.len();
        state.temp_objects.retain(|_, o| !keys.contains(&o.object_key));
        Ok((before - state.temp_objects.len()) as u64)
    }
}

#[async_trait]
impl ItemRepository for InMemoryDatabase {
    async fn create(&self, ctx: &mut TxContext, item: &NewItem) -> Result<ItemId, DomainError> {
        let now = self.now();
        let state = state(ctx, "items.create")?;
        self.controls
            .check(&self.controls.fail_item_inserts, "items.create")?;

        if !state.brands.contains_key(&item.brand_id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("items.create: brand {} violates foreign key", item.brand_id),
            ));
        }

        let id = ItemId::new(state.next_id());
        state.items.insert(
            id,
            Item {
                id,
                brand_id: item.brand_id,
                name: item.name.clone(),
                description: item.description.clone(),
                price: item.price,
                created_at: now,
            },
        );
        for key in &item.image_keys {
            state.item_images.push((id, key.clone()));
        }
        Ok(id)
    }

    async fn is_image_attached(&self, ctx: &mut TxContext, object_key: &str) -> Result<bool, DomainError> {
        let state = state(ctx, "items.is_image_attached")?;
        Ok(state.item_images.iter().any(|(_, key)| key == object_key))
    }
}

#[async_trait]
impl BrandReader for InMemoryDatabase {
    async fn find_by_id(&self, id: BrandId) -> Result<Option<Brand>, DomainError> {
        Ok(self.state.lock().await.brands.get(&id).cloned())
    }
}
