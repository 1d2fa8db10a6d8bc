use super::event::{NotificationPublisher, QueueProvider};
use super::request::{ReplyChannelProvider, Requestor, ResponsePublisher};

/// Factory to provide implementations for the traits from this module
pub trait CommunicationFactory {
    /// [`QueueProvider`] implementation type
    type QueueProvider: QueueProvider + Send + Sync;
    /// [`NotificationPublisher`] implementation type
    type NotificationPublisher: NotificationPublisher + Send + Sync;

    /// [`Requestor`] implementation type
    type Requestor: Requestor + Send + Sync;

    /// [`ReplyChannelProvider`] implementation type
    type ReplyChannelProvider: ReplyChannelProvider + Send + Sync;
    /// [`ResponsePublisher`] implementation type
    type ResponsePublisher: ResponsePublisher + Send + Sync;

    /// Instantiates a new [`QueueProvider`]
    fn queue_provider(&self) -> Self::QueueProvider;
    /// Instantiates a new [`NotificationPublisher`]
    fn notification_publisher(&self) -> Self::NotificationPublisher;

    /// Instantiates a new [`Requestor`] with its own correlation table
    fn requestor(&self) -> Self::Requestor;

    /// Instantiates a new [`ReplyChannelProvider`]
    fn reply_channel_provider(&self) -> Self::ReplyChannelProvider;
    /// Instantiates a new [`ResponsePublisher`]
    fn response_publisher(&self) -> Self::ResponsePublisher;
}
