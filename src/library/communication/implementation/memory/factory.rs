use super::super::super::request::CompositeRequestor;
use super::super::super::CommunicationFactory;
use super::MemoryBroker;

impl CommunicationFactory for MemoryBroker {
    type QueueProvider = MemoryBroker;
    type NotificationPublisher = MemoryBroker;

    type Requestor = CompositeRequestor<MemoryBroker, MemoryBroker>;

    type ReplyChannelProvider = MemoryBroker;
    type ResponsePublisher = MemoryBroker;

    fn queue_provider(&self) -> Self::QueueProvider {
        self.clone()
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        self.clone()
    }

    fn requestor(&self) -> Self::Requestor {
        CompositeRequestor::new(self.clone(), self.clone())
    }

    fn reply_channel_provider(&self) -> Self::ReplyChannelProvider {
        self.clone()
    }

    fn response_publisher(&self) -> Self::ResponsePublisher {
        self.clone()
    }
}
