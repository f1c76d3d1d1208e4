//! Catalog domain - the slice of brands and items the write path touches.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{BrandId, DomainError, ItemId, Timestamp};

/// A brand as read by the notification lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// Input for creating a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub brand_id: BrandId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    /// Keys of previously uploaded temporary objects to attach.
    #[serde(default)]
    pub image_keys: Vec<String>,
}

impl NewItem {
    pub fn new(brand_id: BrandId, name: impl Into<String>, price: u64) -> Self {
        Self {
            brand_id,
            name: name.into(),
            description: String::new(),
            price,
            image_keys: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_images<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects inputs no repository should see.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "Item name cannot be empty"));
        }
        if self.image_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("image_keys", "Image keys cannot be empty"));
        }
        let mut seen = HashSet::new();
        if !self.image_keys.iter().all(|k| seen.insert(k.as_str())) {
            return Err(DomainError::validation("image_keys", "Image keys must be unique"));
        }
        Ok(())
    }
}

/// A stored catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub brand_id: BrandId,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub created_at: Timestamp,
}
