//! Domain layer containing business rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors)
//! - `catalog` - Brands and items touched by the write path
//! - `outbox` - Event records, their lifecycle and notification payloads
//! - `storage` - Temporary uploads and TTL rules
//! - `lock` - Advisory lock identifiers

pub mod catalog;
pub mod foundation;
pub mod lock;
pub mod outbox;
pub mod storage;
