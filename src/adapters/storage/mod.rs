//! Object storage adapters.
//!
//! - **TempObjectCollector** - Background loop deleting abandoned uploads
//! - **LocalObjectStore** - Object store on the local filesystem
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{LocalObjectStore, TempObjectCollector, TempObjectCollectorConfig};
//!
//! let store = Arc::new(LocalObjectStore::new("./data/objects"));
//! let collector = TempObjectCollector::new(locks, coordinator, index, store, config);
//! tokio::spawn(async move { collector.run(shutdown_rx).await });
//! ```

mod local_object_store;
mod temp_object_collector;

pub use local_object_store::LocalObjectStore;
pub use temp_object_collector::{CollectOutcome, TempObjectCollector, TempObjectCollectorConfig};
