use super::super::super::super::{BoxedError, EmptyResult};
use super::super::super::event::{
    QueueDescriptor, QueueProvider, RawNotificationPublisher, RawQueueEntry,
};
use super::super::json::{JsonNotificationPublisher, JsonQueueEntry};
use super::{Delivery, MemoryBroker, MemoryBrokerError, Queue};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

impl MemoryBroker {
    fn take_delivery(&self, queue: &str) -> Result<MemoryQueueEntry, Arc<Notify>> {
        let mut state = self.state();
        let queue_state = state
            .queues
            .entry(queue.to_owned())
            .or_insert_with(|| Queue::new(0));

        match queue_state.ready.pop_front() {
            Some(delivery) => {
                let entry = MemoryQueueEntry {
                    broker: self.clone(),
                    queue: queue.to_owned(),
                    tag: delivery.tag,
                    payload: delivery.payload.clone(),
                    settled: false,
                };

                queue_state.unacked.insert(delivery.tag, delivery);
                Ok(entry)
            }
            None => Err(queue_state.notify.clone()),
        }
    }
}

impl JsonNotificationPublisher for MemoryBroker {}

#[async_trait]
impl RawNotificationPublisher for MemoryBroker {
    async fn publish_raw(&self, data: &[u8], descriptor: QueueDescriptor) -> EmptyResult {
        let mut guard = self.state();
        let state = &mut *guard;
        state.ensure_available()?;

        let bound = state
            .exchanges
            .entry(descriptor.exchange().to_owned())
            .or_default()
            .get(descriptor.routing_key())
            .cloned()
            .unwrap_or_default();

        if bound.is_empty() {
            debug!("Dropping unroutable message to {}", descriptor.key());
        }

        for name in bound {
            let tag = state.next_tag;
            state.next_tag += 1;

            if let Some(queue) = state.queues.get_mut(&name) {
                queue.push(Delivery {
                    tag,
                    payload: data.to_vec(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl QueueProvider for MemoryBroker {
    type Entry = MemoryQueueEntry;

    async fn declare(&self, queue: &QueueDescriptor) -> EmptyResult {
        let mut guard = self.state();
        let state = &mut *guard;
        state.ensure_available()?;

        state
            .exchanges
            .entry(queue.exchange().to_owned())
            .or_default()
            .entry(queue.routing_key().to_owned())
            .or_default()
            .insert(queue.queue().to_owned());

        state
            .queues
            .entry(queue.queue().to_owned())
            .or_insert_with(|| Queue::new(queue.limit()));

        Ok(())
    }

    /// Streams entries one at a time, ignoring the batch size.
    ///
    /// The stream ends when no entry arrived within `idle_timeout`.
    async fn consume(
        &self,
        queue: QueueDescriptor,
        consumer: &str,
        _batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        self.declare(&queue).await?;
        debug!("Consumer {} attached to {}", consumer, queue.queue());

        let seed = (self.clone(), queue.queue().to_owned());
        let stream = stream::unfold(seed, move |(broker, name)| async move {
            loop {
                let notify = match broker.take_delivery(&name) {
                    Ok(entry) => return Some((Ok(entry), (broker, name))),
                    Err(notify) => notify,
                };

                match idle_timeout {
                    Some(timeout) => {
                        if tokio::time::timeout(timeout, notify.notified()).await.is_err() {
                            return None;
                        }
                    }
                    None => notify.notified().await,
                }
            }
        });

        Ok(stream.boxed())
    }
}

/// Delivery from a [`MemoryBroker`] queue
///
/// Dropping an unsettled entry hands it back to the queue.
pub struct MemoryQueueEntry {
    broker: MemoryBroker,
    queue: String,
    tag: u64,
    payload: Vec<u8>,
    settled: bool,
}

impl MemoryQueueEntry {
    fn settle(&mut self, requeue: bool) -> Result<(), MemoryBrokerError> {
        if self.settled {
            return Err(MemoryBrokerError::AlreadySettled(self.tag));
        }

        self.settled = true;

        let mut state = self.broker.state();
        let found = match state.queues.get_mut(&self.queue) {
            Some(queue) if requeue => queue.requeue(self.tag),
            Some(queue) => queue.unacked.remove(&self.tag).is_some(),
            None => false,
        };

        if found {
            Ok(())
        } else {
            Err(MemoryBrokerError::AlreadySettled(self.tag))
        }
    }
}

#[async_trait]
impl RawQueueEntry for MemoryQueueEntry {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        Ok(self.settle(false)?)
    }

    async fn reject(&mut self, requeue: bool) -> EmptyResult {
        Ok(self.settle(requeue)?)
    }
}

impl JsonQueueEntry for MemoryQueueEntry {}

impl Drop for MemoryQueueEntry {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(true).ok();
        }
    }
}
