//! Strongly-typed identifier value objects.
//!
//! Catalog rows use database identity columns, so every id wraps an `i64`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identity value.
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw identity value.
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

integer_id!(
    /// Identifier of an outbox event row.
    EventId
);

integer_id!(
    /// Identifier of a catalog item.
    ItemId
);

integer_id!(
    /// Identifier of a brand.
    BrandId
);

integer_id!(
    /// Identifier of a row in the temporary object index.
    TempObjectId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_raw_value() {
        assert_eq!(EventId::new(42).to_string(), "42");
        assert_eq!(BrandId::from(1).as_i64(), 1);
    }

    #[test]
    fn ids_parse_from_strings() {
        let id: ItemId = "17".parse().unwrap();
        assert_eq!(id, ItemId::new(17));
        assert!("seventeen".parse::<ItemId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&TempObjectId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
