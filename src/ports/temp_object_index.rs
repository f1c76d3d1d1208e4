//! TempObjectIndex port - rows tracking uploads not yet attached to an item.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TempObjectId, Timestamp};
use crate::domain::storage::TempObject;
use crate::ports::TxContext;

/// Port for the temporary object index.
///
/// Every method runs inside the transaction carried by `ctx`.
#[async_trait]
pub trait TempObjectIndex: Send + Sync {
    /// Record an uploaded object.
    ///
    /// Returns `false` when the key was already indexed.
    async fn insert(
        &self,
        ctx: &mut TxContext,
        object_key: &str,
        uploaded_at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Rows uploaded strictly before `cutoff`, locked until the transaction
    /// ends. Rows another transaction already holds are skipped, so younger
    /// uploads and concurrent attaches are never blocked by a sweep.
    async fn list_expired_for_update(
        &self,
        ctx: &mut TxContext,
        cutoff: Timestamp,
    ) -> Result<Vec<TempObject>, DomainError>;

    /// Remove rows by id. Returns how many were removed.
    async fn delete_by_ids(&self, ctx: &mut TxContext, ids: &[TempObjectId]) -> Result<u64, DomainError>;

    /// Remove rows by object key, used when uploads are attached to an item.
    async fn delete_by_keys(&self, ctx: &mut TxContext, keys: &[String]) -> Result<u64, DomainError>;
}
