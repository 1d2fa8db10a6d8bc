use super::super::super::{BoxedError, EmptyResult};
use super::{QueueDescriptor, QueueEntry};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Allows consumption of shared notification queues
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned by the provider
    type Entry: QueueEntry + Send + Sync;

    /// Declares the exchange and the durable queue and binds them using the routing key.
    ///
    /// Declaring an existing topology again is a no-op.
    async fn declare(&self, queue: &QueueDescriptor) -> EmptyResult;

    /// Subscribes to new notifications on a given queue with the given consumer identifier,
    /// declaring the topology if it does not exist yet.
    ///
    /// Entries delivered to this consumer earlier that have not been settled are delivered again.
    async fn consume(
        &self,
        queue: QueueDescriptor,
        consumer: &str,
        batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError>;
}
