//! Catalog Outbox - transactional outbox and background collection for the
//! catalog backend.
//!
//! Business writes record a notification in the same transaction; a
//! background dispatcher delivers those notifications at least once, and a
//! second loop collects uploads that were never attached to an item.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
