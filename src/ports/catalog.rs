//! Catalog ports used by the write path.

use async_trait::async_trait;

use crate::domain::catalog::{Brand, NewItem};
use crate::domain::foundation::{BrandId, DomainError, ItemId};
use crate::ports::TxContext;

/// Read access to brands.
#[async_trait]
pub trait BrandReader: Send + Sync {
    async fn find_by_id(&self, id: BrandId) -> Result<Option<Brand>, DomainError>;
}

/// Write access to items.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert an item and attach its images, inside the transaction in `ctx`.
    async fn create(&self, ctx: &mut TxContext, item: &NewItem) -> Result<ItemId, DomainError>;

    /// Whether any item already uses `object_key` as an image.
    async fn is_image_attached(&self, ctx: &mut TxContext, object_key: &str) -> Result<bool, DomainError>;
}
