//! Application layer - units of work composed from ports.
//!
//! - `TransactionCoordinator` - opens or joins the ambient transaction
//! - `OutboxFacade` - business write plus outbox event, atomically
//! - `TempUploadService` - upload path feeding the temporary object index

mod outbox_facade;
mod temp_upload;
mod transaction;

pub use outbox_facade::OutboxFacade;
pub use temp_upload::TempUploadService;
pub use transaction::{TransactionCoordinator, TxFuture};
