//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - sqlx-backed stores, transactions and advisory locks
//! - `memory` - In-process implementations for tests
//! - `events` - Event dispatcher loop and Redis message sink
//! - `storage` - Temp object collector loop and filesystem object store

pub mod events;
pub mod memory;
pub mod postgres;
pub mod storage;

pub use events::{DispatchReport, EventDispatcher, EventDispatcherConfig, RedisMessageSink};
pub use storage::{CollectOutcome, LocalObjectStore, TempObjectCollector, TempObjectCollectorConfig};
