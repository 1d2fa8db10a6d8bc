use super::super::super::{BoxedError, EmptyResult};
use super::Notification;
use super::{QueueEntry, QueueProvider};
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_CONCURRENCY: usize = DEFAULT_BATCH_SIZE;
const DEFAULT_IDLE_TIMEOUT: Option<Duration> = None;

/// Reason why a notification could not be consumed
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Processing may succeed when retried, the notification is handed back to the queue
    #[error("transient consumer failure")]
    Transient(#[source] BoxedError),
    /// Processing will never succeed, the notification is dropped
    #[error("permanent consumer failure")]
    Permanent(#[source] BoxedError),
}

/// Entity which may consume and process [`Notifications`](Notification)
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: Notification;

    /// Processes a notification and returns whether it succeeded or failed
    async fn consume(&self, notification: Self::Notification) -> Result<(), ConsumerError>;
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Consumes notifications from a queue using the given provider and settles each of them:
    ///
    /// - entries that fail to parse are rejected without requeueing as they will never become valid
    /// - successfully consumed entries are acknowledged
    /// - entries which failed transiently are rejected and requeued for redelivery
    /// - entries which failed permanently are rejected without requeueing
    ///
    /// A failure is isolated to the entry it occurred on, the loop itself only ends when the queue does.
    async fn consume_queue<Q>(&self, provider: Q, consumer: &str) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync,
    C::Notification: DeserializeOwned + Send + Sync,
{
    async fn consume_queue<Q>(&self, provider: Q, consumer: &str) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync,
    {
        let stream = provider
            .consume(
                C::Notification::queue(),
                consumer,
                DEFAULT_BATCH_SIZE,
                DEFAULT_IDLE_TIMEOUT,
            )
            .await?;

        stream
            .for_each_concurrent(Some(DEFAULT_CONCURRENCY), |item| async move {
                match item {
                    Ok(mut entry) => process_entry(self, &mut entry).await,
                    Err(e) => warn!(
                        "Failed to receive notification {}: {}",
                        type_name::<C::Notification>(),
                        e
                    ),
                }
            })
            .await;

        Ok(())
    }
}

async fn process_entry<C, E>(consumer: &C, entry: &mut E)
where
    C: Consumer + Send + Sync,
    C::Notification: DeserializeOwned + Send + Sync,
    E: QueueEntry + Send + Sync,
{
    let name = type_name::<C::Notification>();

    let notification = match entry.parse_payload::<C::Notification>() {
        Ok(notification) => notification,
        Err(e) => {
            warn!("Dropping malformed {}: {}", name, e);
            if let Err(e) = entry.reject(false).await {
                warn!("Failed to reject malformed {}: {}", name, e);
            }
            return;
        }
    };

    let settlement = match consumer.consume(notification).await {
        Ok(_) => entry.acknowledge().await,
        Err(ConsumerError::Transient(e)) => {
            warn!("Failed to consume {}, requeueing: {}", name, e);
            entry.reject(true).await
        }
        Err(ConsumerError::Permanent(e)) => {
            warn!("Failed to consume {}, dropping: {}", name, e);
            entry.reject(false).await
        }
    };

    match settlement {
        Ok(_) => debug!("Settled {}", name),
        Err(e) => warn!("Failed to settle {}: {}", name, e),
    }
}
