//! AdvisoryLockService port - cooperative, database-level mutual exclusion.
//!
//! The lock is advisory: code that never acquires it is not stopped from
//! touching the protected rows. Implementations backed by a connection pool
//! must run acquire and release on the same session, which is why acquire
//! hands back a [`HeldLock`] that owns that session.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::lock::AdvisoryLockId;

/// A lock currently held by this process.
///
/// Dropping it without calling `release` must still free the lock, at the
/// latest when the underlying session ends.
#[async_trait]
pub trait HeldLock: Send {
    fn id(&self) -> AdvisoryLockId;

    async fn release(self: Box<Self>) -> Result<(), DomainError>;
}

/// Port for acquiring advisory locks.
#[async_trait]
pub trait AdvisoryLockService: Send + Sync {
    /// Block until the lock is free, then take it.
    async fn acquire(&self, id: AdvisoryLockId) -> Result<Box<dyn HeldLock>, DomainError>;
}
