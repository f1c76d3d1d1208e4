//! Redis message sink for production deployments.
//!
//! Each event is published to channel `<prefix><event_type>` with its
//! payload as the message body. Redis pub/sub keeps nothing for absent
//! subscribers; the outbox lease still guarantees that an event that could
//! not be published is retried.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::MessageSink;

/// Publishes outbox events over Redis pub/sub.
#[derive(Clone)]
pub struct RedisMessageSink {
    conn: MultiplexedConnection,
    channel_prefix: String,
}

impl RedisMessageSink {
    /// Create a sink on an open connection.
    pub fn new(conn: MultiplexedConnection, channel_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            channel_prefix: channel_prefix.into(),
        }
    }

    /// Open a multiplexed connection to `url` and wrap it.
    pub async fn connect(url: &str, channel_prefix: impl Into<String>) -> Result<Self, DomainError> {
        let client = redis::Client::open(url).map_err(|e| {
            DomainError::new(
                ErrorCode::MessageSinkError,
                format!("Invalid Redis URL: {}", e),
            )
        })?;

        let conn = client.get_multiplexed_tokio_connection().await.map_err(|e| {
            DomainError::new(
                ErrorCode::MessageSinkError,
                format!("Failed to connect to Redis: {}", e),
            )
        })?;

        Ok(Self::new(conn, channel_prefix))
    }

    /// Channel an event type is published on.
    pub fn channel_for(&self, event_type: &str) -> String {
        channel_name(&self.channel_prefix, event_type)
    }
}

fn channel_name(prefix: &str, event_type: &str) -> String {
    format!("{}{}", prefix, event_type)
}

#[async_trait]
impl MessageSink for RedisMessageSink {
    async fn send(&self, event_type: &str, payload: &[u8]) -> Result<(), DomainError> {
        let channel = self.channel_for(event_type);
        let mut conn = self.conn.clone();

        let receivers: i64 = conn
            .publish(&channel, payload)
            .await
            .map_err(|e: redis::RedisError| {
                DomainError::new(
                    ErrorCode::MessageSinkError,
                    format!("Failed to publish to {}: {}", channel, e),
                )
            })?;

        tracing::debug!(channel = %channel, receivers, "Event published");
        Ok(())
    }
}
