use crate::library::communication::implementation::redis::{
    RedisFactory, RedisPublisher, RedisQueueProvider, RedisReplyChannelProvider,
};
use crate::library::communication::request::CompositeRequestor;
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::lock::Mutex;
use log::debug;
use redis::aio::{Connection, MultiplexedConnection};
use redis::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// [`CommunicationFactory`] implementation for redis based communication
///
/// All clones share a single multiplexed connection which is established lazily on first use.
#[derive(Clone)]
pub struct RedisCommunicationFactory {
    client: Client,
    shared: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisCommunicationFactory {
    /// Creates a new instance for the redis server at the given URL without connecting to it
    pub fn new(url: &str) -> Result<Self, BoxedError> {
        Ok(Self {
            client: Client::open(url)?,
            shared: Arc::new(Mutex::new(None)),
        })
    }
}

#[async_trait]
impl RedisFactory for RedisCommunicationFactory {
    async fn shared(&self) -> Result<MultiplexedConnection, BoxedError> {
        let mut shared = self.shared.lock().await;

        if let Some(con) = &*shared {
            return Ok(con.clone());
        }

        debug!("Establishing shared redis connection");
        let con = timeout(
            CONNECT_TIMEOUT,
            self.client.get_multiplexed_tokio_connection(),
        )
        .await??;

        *shared = Some(con.clone());
        Ok(con)
    }

    async fn owned(&self) -> Result<Connection, BoxedError> {
        Ok(timeout(CONNECT_TIMEOUT, self.client.get_async_connection()).await??)
    }
}

impl CommunicationFactory for RedisCommunicationFactory {
    type QueueProvider = RedisQueueProvider<Self>;
    type NotificationPublisher = RedisPublisher<Self>;

    type Requestor = CompositeRequestor<RedisPublisher<Self>, RedisReplyChannelProvider<Self>>;

    type ReplyChannelProvider = RedisReplyChannelProvider<Self>;
    type ResponsePublisher = RedisPublisher<Self>;

    fn queue_provider(&self) -> Self::QueueProvider {
        RedisQueueProvider::new(self.clone())
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        RedisPublisher::new(self.clone())
    }

    fn requestor(&self) -> Self::Requestor {
        CompositeRequestor::new(
            self.notification_publisher(),
            self.reply_channel_provider(),
        )
    }

    fn reply_channel_provider(&self) -> Self::ReplyChannelProvider {
        RedisReplyChannelProvider::new(self.clone())
    }

    fn response_publisher(&self) -> Self::ResponsePublisher {
        RedisPublisher::new(self.clone())
    }
}
