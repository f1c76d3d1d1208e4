//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the core and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `Transaction` / `TransactionProvider` / `TxContext` - Ambient unit of work
//! - `OutboxStore` - Outbox events with a NEW -> RESERVED -> DONE lifecycle
//! - `TempObjectIndex` - Index of uploads awaiting attachment or collection
//! - `ItemRepository` / `BrandReader` - Catalog slice used by the write path
//!
//! ## Coordination Ports
//!
//! - `AdvisoryLockService` - Session-scoped database mutex per resource
//!
//! ## Collaborator Ports
//!
//! - `MessageSink` - Transport for dispatched events
//! - `ObjectStore` - Blob storage for uploads

mod advisory_lock;
mod catalog;
mod message_sink;
mod object_store;
mod outbox_store;
mod temp_object_index;
mod transaction;

pub use advisory_lock::{AdvisoryLockService, HeldLock};
pub use catalog::{BrandReader, ItemRepository};
pub use message_sink::MessageSink;
pub use object_store::{ObjectStore, StorageError};
pub use outbox_store::OutboxStore;
pub use temp_object_index::TempObjectIndex;
pub use transaction::{Transaction, TransactionProvider, TxContext};
