//! Outbox domain - events persisted alongside business writes.

mod event;
mod payload;

pub use event::{Event, EventStatus, NewEvent, ReservationPolicy, EVENT_CREATE_ITEM};
pub use payload::CreateItemPayload;
