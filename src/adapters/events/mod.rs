//! Event delivery adapters.
//!
//! - `EventDispatcher` - Background loop delivering outbox events
//! - `RedisMessageSink` - Message sink publishing over Redis pub/sub

mod event_dispatcher;
mod redis_sink;

pub use event_dispatcher::{DispatchReport, EventDispatcher, EventDispatcherConfig};
pub use redis_sink::RedisMessageSink;
