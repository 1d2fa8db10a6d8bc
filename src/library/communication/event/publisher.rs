use super::{super::super::EmptyResult, Notification, QueueDescriptor};
use async_trait::async_trait;

/// Structure which allows publishing of serialized data to an exchange
#[async_trait]
pub trait RawNotificationPublisher {
    /// Sends an opaque, persistent payload to the exchange and routing key of a [`Queue`](QueueDescriptor)
    async fn publish_raw(&self, data: &[u8], descriptor: QueueDescriptor) -> EmptyResult;
}

/// Publisher for [`Notifications`](Notification)
#[async_trait]
pub trait NotificationPublisher {
    /// Publishes a [`Notification`] to its designated queue
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult;
}
