//! PostgreSQL adapters - sqlx implementations of the storage ports.
//!
//! - `PostgresTransactionProvider` - transactions for the ambient `TxContext`
//! - `PostgresAdvisoryLocks` - session-level advisory locks on pinned connections
//! - `PostgresOutboxStore` - outbox table with leased reservations
//! - `PostgresTempObjectIndex` - temporary upload index
//! - `PostgresItemRepository` / `PostgresBrandReader` - catalog slice

mod advisory_lock;
mod catalog;
mod outbox_store;
mod temp_object_index;
mod transaction;

pub use advisory_lock::PostgresAdvisoryLocks;
pub use catalog::{PostgresBrandReader, PostgresItemRepository};
pub use outbox_store::PostgresOutboxStore;
pub use temp_object_index::PostgresTempObjectIndex;
pub use transaction::{PgTx, PostgresTransactionProvider};
