use super::super::super::super::{BoxedError, EmptyResult};
use super::super::super::request::{RawReplyChannel, RawResponsePublisher, ReplyChannelProvider};
use super::super::json::{JsonReplyChannel, JsonResponsePublisher};
use super::{MemoryBroker, MemoryBrokerError};
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

impl MemoryBroker {
    fn unbind(&self, location: &str) {
        if self.state().replies.remove(location).is_some() {
            self.replies_changed.notify_waiters();
        }
    }
}

impl JsonResponsePublisher for MemoryBroker {}

#[async_trait]
impl RawResponsePublisher for MemoryBroker {
    async fn publish_raw(&self, data: &[u8], location: &str) -> EmptyResult {
        let state = self.state();
        state.ensure_available()?;

        let delivered = state
            .replies
            .get(location)
            .map(|sender| sender.send(data.to_vec()).is_ok())
            .unwrap_or_default();

        if !delivered {
            debug!("Dropping reply to unbound address {}", location);
        }

        Ok(())
    }
}

#[async_trait]
impl ReplyChannelProvider for MemoryBroker {
    type Channel = MemoryReplyChannel;

    async fn open(&self, location: &str) -> Result<Self::Channel, BoxedError> {
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut state = self.state();
            state.ensure_available()?;

            if state.replies.contains_key(location) {
                return Err(MemoryBrokerError::AlreadyBound(location.to_owned()).into());
            }

            state.replies.insert(location.to_owned(), tx);
        }

        self.replies_changed.notify_waiters();

        Ok(MemoryReplyChannel {
            broker: self.clone(),
            location: location.to_owned(),
            receiver: rx,
            closed: false,
        })
    }
}

/// Exclusive reply channel bound on a [`MemoryBroker`]
///
/// Dropping the channel unbinds it immediately.
pub struct MemoryReplyChannel {
    broker: MemoryBroker,
    location: String,
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: bool,
}

#[async_trait]
impl RawReplyChannel for MemoryReplyChannel {
    async fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, BoxedError> {
        Ok(self.receiver.recv().await)
    }

    async fn close(&mut self) -> EmptyResult {
        if !self.closed {
            self.closed = true;
            self.broker.unbind(&self.location);
            self.receiver.close();
        }

        Ok(())
    }
}

impl JsonReplyChannel for MemoryReplyChannel {}

impl Drop for MemoryReplyChannel {
    fn drop(&mut self) {
        if !self.closed {
            self.broker.unbind(&self.location);
        }
    }
}

#[cfg(test)]
mod does {
    use super::super::super::super::request::ReplyChannel;
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn deliver_to_bound_channel() {
        let broker = MemoryBroker::default();
        let mut channel = broker.open("reply.a").await.unwrap();

        RawResponsePublisher::publish_raw(&broker, b"42", "reply.a")
            .await
            .unwrap();

        assert_eq!(channel.receive::<u32>().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn refuse_second_binding() {
        let broker = MemoryBroker::default();
        let _channel = broker.open("reply.a").await.unwrap();

        assert!(broker.open("reply.a").await.is_err());
    }

    #[tokio::test]
    async fn drop_replies_to_unbound_address() {
        let broker = MemoryBroker::default();
        let mut channel = broker.open("reply.a").await.unwrap();
        ReplyChannel::close(&mut channel).await.unwrap();

        RawResponsePublisher::publish_raw(&broker, b"42", "reply.a")
            .await
            .unwrap();

        assert_eq!(broker.bound_reply_channels(), 0);
        assert_eq!(channel.receive::<u32>().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unbind_dropped_channel() {
        let broker = MemoryBroker::default();
        let channel = broker.open("reply.a").await.unwrap();
        assert!(broker.is_bound("reply.a"));

        drop(channel);

        assert!(!broker.is_bound("reply.a"));
        assert!(broker.open("reply.a").await.is_ok());
    }

    #[tokio::test]
    async fn refuse_binding_while_unavailable() {
        let broker = MemoryBroker::default();
        broker.set_available(false);

        assert!(broker.open("reply.a").await.is_err());
        assert_eq!(broker.bound_reply_channels(), 0);
    }
}
