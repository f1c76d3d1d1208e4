//! MessageSink port - where dispatched events go.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for handing events to an external transport.
///
/// `Ok` means "accepted for transport", nothing more. The dispatcher may
/// send the same event more than once, so consumers must be idempotent.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, event_type: &str, payload: &[u8]) -> Result<(), DomainError>;
}
