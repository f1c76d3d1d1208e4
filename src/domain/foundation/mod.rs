//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and the error type shared by
//! every other domain module.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{BrandId, EventId, ItemId, TempObjectId};
pub use timestamp::Timestamp;
