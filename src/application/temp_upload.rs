//! TempUploadService - stores an upload and records it for collection.
//!
//! The object is written first and indexed second. An indexed key whose
//! object is missing is harmless (the collector treats it as already gone);
//! an object with no index row would never be collected, so a failed index
//! insert deletes the object again.
//!
//! A caller-chosen key that an item already uses is refused before any
//! bytes are written, and checked again next to the index insert so a
//! concurrent attach cannot turn the item's image back into a temporary
//! object.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::TransactionCoordinator;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{ItemRepository, ObjectStore, TempObjectIndex, TxContext};

/// Handles image uploads that are not yet attached to an item.
pub struct TempUploadService {
    coordinator: TransactionCoordinator,
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn TempObjectIndex>,
    items: Arc<dyn ItemRepository>,
}

impl TempUploadService {
    pub fn new(
        coordinator: TransactionCoordinator,
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn TempObjectIndex>,
        items: Arc<dyn ItemRepository>,
    ) -> Self {
        Self {
            coordinator,
            store,
            index,
            items,
        }
    }

    /// Store `content` and index it as a temporary object.
    ///
    /// Uses `key` when given, otherwise a fresh UUID. Uploading an already
    /// indexed key replaces the bytes and keeps the original row.
    ///
    /// Returns the object key.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a blank key
    /// - `ObjectKeyInUse` when an item already uses the key; the stored
    ///   object is left untouched
    pub async fn upload(
        &self,
        key: Option<String>,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, DomainError> {
        let key = match key {
            Some(k) if !k.trim().is_empty() => {
                self.ensure_unattached(&k).await?;
                k
            }
            Some(_) => return Err(DomainError::validation("key", "Object key cannot be empty")),
            None => Uuid::new_v4().to_string(),
        };

        self.store.put(&key, content, content_type).await?;

        let index = Arc::clone(&self.index);
        let items = Arc::clone(&self.items);
        let indexed_key = key.clone();
        let uploaded_at = Timestamp::now();
        let mut ctx = TxContext::new();

        let inserted = self
            .coordinator
            .run_in_transaction(&mut ctx, move |tx| {
                Box::pin(async move {
                    let inserted = index.insert(tx, &indexed_key, uploaded_at).await?;
                    if items.is_image_attached(tx, &indexed_key).await? {
                        return Err(key_in_use(&indexed_key));
                    }
                    Ok(inserted)
                })
            })
            .await;

        match inserted {
            Ok(true) => {
                tracing::info!(object_key = %key, size = content.len(), "Temporary object uploaded");
                Ok(key)
            }
            Ok(false) => {
                tracing::debug!(object_key = %key, "Temporary object already indexed");
                Ok(key)
            }
            Err(e) if e.code == ErrorCode::ObjectKeyInUse => {
                tracing::warn!(object_key = %key, "Upload raced an item attaching the same key");
                Err(e)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&key).await {
                    if !cleanup.is_not_found() {
                        tracing::error!(
                            object_key = %key,
                            error = %cleanup,
                            "Failed to remove unindexed object"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn ensure_unattached(&self, key: &str) -> Result<(), DomainError> {
        let items = Arc::clone(&self.items);
        let checked_key = key.to_string();

        let attached = self
            .coordinator
            .run_in_transaction(&mut TxContext::new(), move |tx| {
                Box::pin(async move { items.is_image_attached(tx, &checked_key).await })
            })
            .await?;

        if attached {
            tracing::warn!(object_key = %key, "Refused upload over an attached image");
            return Err(key_in_use(key));
        }
        Ok(())
    }
}

fn key_in_use(key: &str) -> DomainError {
    DomainError::new(
        ErrorCode::ObjectKeyInUse,
        format!("Object key is already attached to an item: {}", key),
    )
    .with_detail("object_key", key)
}
