//! Outbox event records and their NEW -> RESERVED -> DONE lifecycle.
//!
//! RESERVED is not a stored status: an event is reserved while its
//! `reserved_until` lease lies in the future.

use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp};

/// Event type emitted when a catalog item is created.
pub const EVENT_CREATE_ITEM: &str = "create_item";

/// Persisted status of an outbox event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// Waiting for (re)delivery.
    New,
    /// Delivered; never dispatched again.
    Done,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::New => "new",
            EventStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "new" => Ok(EventStatus::New),
            "done" => Ok(EventStatus::Done),
            other => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid outbox status: {}", other),
            )),
        }
    }
}

/// A stored outbox event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub status: EventStatus,
    pub created_at: Timestamp,
    pub reserved_until: Option<Timestamp>,
}

impl Event {
    /// Whether a fetch at `now` may reserve this event.
    ///
    /// Status must be NEW and any previous lease must have expired
    /// strictly before `now`.
    pub fn is_eligible(&self, now: &Timestamp) -> bool {
        self.status == EventStatus::New
            && self
                .reserved_until
                .map_or(true, |until| until.is_before(now))
    }

    /// Whether a lease is currently held at `now`.
    pub fn is_reserved(&self, now: &Timestamp) -> bool {
        self.status == EventStatus::New
            && self.reserved_until.map_or(false, |until| !until.is_before(now))
    }

    /// Places a lease on the event.
    pub fn reserve(&mut self, until: Timestamp) {
        self.reserved_until = Some(until);
    }

    /// Marks the event delivered. Repeating the call changes nothing.
    pub fn mark_done(&mut self) {
        self.status = EventStatus::Done;
    }
}

/// An event about to be inserted by the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event_type: String,
    pub payload: Vec<u8>,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Serializes `body` as the JSON payload of a new event.
    pub fn json<T: Serialize>(event_type: impl Into<String>, body: &T) -> Result<Self, DomainError> {
        let payload = serde_json::to_vec(body).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to serialize event payload: {}", e),
            )
        })?;
        Ok(Self::new(event_type, payload))
    }
}

/// How the dispatcher's fetch step claims events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// Lease placed on every reserved event.
    pub lease: Duration,
    /// Maximum events reserved by one fetch.
    pub batch_size: u32,
}

impl ReservationPolicy {
    pub fn new(lease: Duration, batch_size: u32) -> Self {
        Self { lease, batch_size }
    }

    /// The lease end for a reservation taken at `now`.
    pub fn reserved_until(&self, now: &Timestamp) -> Timestamp {
        now.plus(self.lease)
    }
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(300),
            batch_size: 100,
        }
    }
}
