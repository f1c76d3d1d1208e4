//! Recording message sink for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessageSink;

/// A message accepted by [`InMemoryMessageSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub event_type: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct SinkState {
    sent: Vec<SentMessage>,
    attempts: usize,
    failing_types: HashSet<String>,
    failing_payloads: HashSet<Vec<u8>>,
}

/// Message sink that records what it accepts and can be told to reject.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageSink {
    state: Arc<Mutex<SinkState>>,
}

impl InMemoryMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message of `event_type`.
    pub async fn fail_event_type(&self, event_type: &str) {
        self.state.lock().await.failing_types.insert(event_type.to_string());
    }

    /// Reject every message carrying exactly `payload`.
    pub async fn fail_payload(&self, payload: &[u8]) {
        self.state.lock().await.failing_payloads.insert(payload.to_vec());
    }

    /// Accept everything again.
    pub async fn heal(&self) {
        let mut state = self.state.lock().await;
        state.failing_types.clear();
        state.failing_payloads.clear();
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().await.sent.clone()
    }

    /// Calls to `send`, accepted or not.
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl MessageSink for InMemoryMessageSink {
    async fn send(&self, event_type: &str, payload: &[u8]) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;

        if state.failing_types.contains(event_type) || state.failing_payloads.contains(payload) {
            return Err(DomainError::new(
                ErrorCode::MessageSinkError,
                format!("Injected send failure for {}", event_type),
            ));
        }

        state.sent.push(SentMessage {
            event_type: event_type.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
