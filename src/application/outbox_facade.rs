//! OutboxFacade - the write path of the Transactional Outbox Pattern.
//!
//! A business write and the notification describing it commit together or
//! not at all. Everything the notification needs from other aggregates is
//! looked up before the transaction starts, so a failed lookup leaves no
//! trace.

use std::sync::Arc;

use crate::application::TransactionCoordinator;
use crate::domain::catalog::NewItem;
use crate::domain::foundation::{DomainError, ErrorCode, ItemId};
use crate::domain::outbox::{CreateItemPayload, NewEvent, EVENT_CREATE_ITEM};
use crate::ports::{BrandReader, ItemRepository, OutboxStore, TempObjectIndex, TxContext};

/// Executes catalog writes together with their outbox events.
pub struct OutboxFacade {
    coordinator: TransactionCoordinator,
    brands: Arc<dyn BrandReader>,
    items: Arc<dyn ItemRepository>,
    temp_objects: Arc<dyn TempObjectIndex>,
    outbox: Arc<dyn OutboxStore>,
}

impl OutboxFacade {
    pub fn new(
        coordinator: TransactionCoordinator,
        brands: Arc<dyn BrandReader>,
        items: Arc<dyn ItemRepository>,
        temp_objects: Arc<dyn TempObjectIndex>,
        outbox: Arc<dyn OutboxStore>,
    ) -> Self {
        Self {
            coordinator,
            brands,
            items,
            temp_objects,
            outbox,
        }
    }

    /// Create an item and its `create_item` event atomically.
    ///
    /// Attached uploads leave the temp index in the same transaction, so
    /// the collector can no longer delete them.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a malformed item
    /// - `BrandNotFound` when the brand lookup finds nothing (no write happens)
    /// - `UploadNotFound` when an image key is not in the temp index, either
    ///   never uploaded, already attached or already collected
    /// - Any store error, after the whole transaction rolled back
    pub async fn create_item_with_notification(
        &self,
        ctx: &mut TxContext,
        item: NewItem,
    ) -> Result<ItemId, DomainError> {
        item.validate()?;

        // 1. Look up what the notification needs, outside the transaction
        let brand = self
            .brands
            .find_by_id(item.brand_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::BrandNotFound,
                    format!("Brand not found: {}", item.brand_id),
                )
            })?;

        let items = Arc::clone(&self.items);
        let temp_objects = Arc::clone(&self.temp_objects);
        let outbox = Arc::clone(&self.outbox);

        // 2. Business write + outbox insert, one transaction
        let result = self
            .coordinator
            .run_in_transaction(ctx, move |tx| {
                Box::pin(async move {
                    let item_id = items.create(tx, &item).await?;

                    // Every attached key must still be a pending upload; a key
                    // the collector already took has no object behind it.
                    if !item.image_keys.is_empty() {
                        let claimed = temp_objects.delete_by_keys(tx, &item.image_keys).await?;
                        if claimed != item.image_keys.len() as u64 {
                            return Err(DomainError::new(
                                ErrorCode::UploadNotFound,
                                format!(
                                    "{} of {} image keys are not pending uploads",
                                    item.image_keys.len() as u64 - claimed,
                                    item.image_keys.len()
                                ),
                            ));
                        }
                    }

                    let payload = CreateItemPayload {
                        item_id,
                        brand_name: brand.name,
                        item_name: item.name,
                        price: item.price,
                    };
                    let event = NewEvent::json(EVENT_CREATE_ITEM, &payload)?;
                    outbox.create_event(tx, event).await?;

                    Ok(item_id)
                })
            })
            .await;

        match &result {
            Ok(item_id) => tracing::info!(item_id = %item_id, "Item created with notification"),
            Err(e) => tracing::error!(error = %e, "Item creation rolled back"),
        }

        result
    }
}
