//! In-memory adapters.
//!
//! Every port has an in-process implementation here with failure injection,
//! so the write path and both background loops can be exercised without
//! PostgreSQL, Redis or a filesystem.
//!
//! - `InMemoryDatabase` - transactions, outbox, temp index, catalog
//! - `InMemoryAdvisoryLocks` - per-id mutexes
//! - `InMemoryMessageSink` - records accepted messages
//! - `InMemoryObjectStore` - objects in a map

mod advisory_lock;
mod database;
mod message_sink;
mod object_store;

pub use advisory_lock::InMemoryAdvisoryLocks;
pub use database::{InMemoryDatabase, InMemoryTx};
pub use message_sink::{InMemoryMessageSink, SentMessage};
pub use object_store::InMemoryObjectStore;
