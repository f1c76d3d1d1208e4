//! Notification bodies written to the outbox.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ItemId;

/// Body of a `create_item` event.
///
/// Carries the brand name denormalized so consumers need no lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItemPayload {
    pub item_id: ItemId,
    pub brand_name: String,
    pub item_name: String,
    pub price: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_uses_snake_case_field_names() {
        let payload = CreateItemPayload {
            item_id: ItemId::new(3),
            brand_name: "Acme".to_string(),
            item_name: "Test".to_string(),
            price: 100,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"item_id": 3, "brand_name": "Acme", "item_name": "Test", "price": 100})
        );
    }
}
