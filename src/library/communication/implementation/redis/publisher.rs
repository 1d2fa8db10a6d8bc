use super::super::super::super::EmptyResult;
use super::super::super::event::{QueueDescriptor, RawNotificationPublisher};
use super::super::super::request::RawResponsePublisher;
use super::super::json::{JsonNotificationPublisher, JsonResponsePublisher};
use super::{binding_key, response_key, RedisFactory};
use super::{REPLY_TTL_SECS, STREAM_ID_NEW, STREAM_PAYLOAD_KEY};
use async_trait::async_trait;
use log::debug;
use redis::streams::StreamMaxlen;
use redis::{AsyncCommands, Script};

/// Appends the reply only while the channel is bound and lets abandoned lists expire
const DELIVER_REPLY_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[2]) == 1 then
    redis.call('RPUSH', KEYS[1], ARGV[1])
    redis.call('EXPIRE', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Multi-purpose publisher implementation using redis
///
/// - [`NotificationPublisher`](super::super::super::event::NotificationPublisher) implementation using [`XADD`](https://redis.io/commands/xadd)
/// - [`ResponsePublisher`](super::super::super::request::ResponsePublisher) implementation using [`RPUSH`](https://redis.io/commands/rpush)
///   guarded by the binding marker of the reply channel
#[derive(Clone)]
pub struct RedisPublisher<F: RedisFactory> {
    factory: F,
}

impl<F> RedisPublisher<F>
where
    F: RedisFactory,
{
    /// Creates a new instance from a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> JsonNotificationPublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}
impl<F> JsonResponsePublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}

#[async_trait]
impl<F> RawNotificationPublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(&self, data: &[u8], descriptor: QueueDescriptor) -> EmptyResult {
        let limit = StreamMaxlen::Approx(descriptor.limit());
        let mut con = self.factory.shared().await?;

        con.xadd_maxlen::<_, _, _, _, ()>(
            descriptor.key(),
            limit,
            STREAM_ID_NEW,
            &[(STREAM_PAYLOAD_KEY, data)],
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl<F> RawResponsePublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(&self, data: &[u8], location: &str) -> EmptyResult {
        let mut con = self.factory.shared().await?;

        let delivered: i64 = Script::new(DELIVER_REPLY_SCRIPT)
            .key(response_key(location))
            .key(binding_key(location))
            .arg(data)
            .arg(REPLY_TTL_SECS)
            .invoke_async(&mut con)
            .await?;

        if delivered == 0 {
            debug!("Dropping reply to unbound address {}", location);
        }

        Ok(())
    }
}
