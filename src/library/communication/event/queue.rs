use super::super::super::BoxedError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Describes the broker topology a notification travels through
///
/// Notifications are published to an `exchange` under a `routing_key`. The durable `queue`
/// is bound to that exchange with the same routing key and shared by all consumers of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    exchange: String,
    routing_key: String,
    queue: String,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(exchange: String, routing_key: String, queue: String, limit: usize) -> Self {
        Self {
            exchange,
            routing_key,
            queue,
            limit,
        }
    }

    /// Name of the exchange notifications are published to
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key used when publishing and binding
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Name of the durable queue shared by all consumers
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Flattened `exchange.routing_key` address for backends without exchange indirection
    pub fn key(&self) -> String {
        format!("{}.{}", self.exchange, self.routing_key)
    }

    /// Maximum number of notifications to be retained in the queue
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
///
/// Each entry has to be settled exactly once, either by acknowledging or by rejecting it.
#[async_trait]
pub trait RawQueueEntry {
    /// Payload of the item
    fn payload(&self) -> &[u8];

    /// Acknowledge the item as processed
    async fn acknowledge(&mut self) -> EmptyResult;

    /// Reject the item, either dropping it or handing it back to the queue for redelivery
    async fn reject(&mut self, requeue: bool) -> EmptyResult;
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>;
}
