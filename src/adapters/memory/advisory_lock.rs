//! In-process advisory locks with failure injection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::lock::AdvisoryLockId;
use crate::ports::{AdvisoryLockService, HeldLock};

#[derive(Debug, Default)]
struct Counters {
    fail_acquire: AtomicBool,
    fail_release: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Advisory locks shared by every clone, one mutex per id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdvisoryLocks {
    locks: Arc<Mutex<HashMap<AdvisoryLockId, Arc<Mutex<()>>>>>,
    counters: Arc<Counters>,
}

impl InMemoryAdvisoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.counters.fail_acquire.store(fail, Ordering::SeqCst);
    }

    pub fn fail_release(&self, fail: bool) {
        self.counters.fail_release.store(fail, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Whether some holder currently owns `id`.
    pub async fn is_held(&self, id: AdvisoryLockId) -> bool {
        let mutex = self.mutex_for(id).await;
        let held = mutex.try_lock().is_err();
        held
    }

    async fn mutex_for(&self, id: AdvisoryLockId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }
}

struct InMemoryHeldLock {
    id: AdvisoryLockId,
    _guard: OwnedMutexGuard<()>,
    counters: Arc<Counters>,
}

#[async_trait]
impl HeldLock for InMemoryHeldLock {
    fn id(&self) -> AdvisoryLockId {
        self.id
    }

    async fn release(self: Box<Self>) -> Result<(), DomainError> {
        // The guard drops on both paths, like a failed unlock closing its session.
        if self.counters.fail_release.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::LockError,
                format!("Injected unlock failure for lock {}", self.id),
            ));
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl AdvisoryLockService for InMemoryAdvisoryLocks {
    async fn acquire(&self, id: AdvisoryLockId) -> Result<Box<dyn HeldLock>, DomainError> {
        if self.counters.fail_acquire.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::LockError,
                format!("Injected lock failure for lock {}", id),
            ));
        }

        let guard = self.mutex_for(id).await.lock_owned().await;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(InMemoryHeldLock {
            id,
            _guard: guard,
            counters: Arc::clone(&self.counters),
        }))
    }
}
