//! Trait implementations using [`redis`](::redis)
//!
//! Shared queues are mapped onto [Redis Streams](https://redis.io/topics/streams-intro) keyed by
//! `<exchange>.<routing key>` and consumed through a consumer group named after the queue.
//! Reply channels are lists keyed `response.<address>` which only accept replies while their
//! binding marker exists.

const RESPONSE_KEY_PREFIX: &str = "response.";
const BINDING_KEY_SUFFIX: &str = ".bound";
const STREAM_PAYLOAD_KEY: &str = "payload";
const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_ADDITIONS: &str = ">";

/// Seconds a reply list survives without being read
const REPLY_TTL_SECS: usize = 60;
/// Seconds after which a binding that has never been closed expires
const BINDING_TTL_SECS: usize = 3600;

use thiserror::Error;

mod factory;
mod publisher;
mod queue_entry;
mod queue_provider;
mod reply_channel;

pub use factory::*;
pub use publisher::*;
pub use queue_entry::*;
pub use queue_provider::*;
pub use reply_channel::*;

#[derive(Debug, Error)]
enum RedisQueueError {
    #[error("payload field missing from queue entry")]
    MissingPayload,
    #[error("reply address {0} is already bound")]
    AlreadyBound(String),
}

fn response_key(location: &str) -> String {
    format!("{}{}", RESPONSE_KEY_PREFIX, location)
}

fn binding_key(location: &str) -> String {
    format!("{}{}{}", RESPONSE_KEY_PREFIX, location, BINDING_KEY_SUFFIX)
}
