use super::super::super::super::{BoxedError, EmptyResult};
use super::super::super::request::{RawReplyChannel, ReplyChannelProvider};
use super::super::json::JsonReplyChannel;
use super::{binding_key, response_key, RedisFactory, RedisQueueError, BINDING_TTL_SECS};
use async_trait::async_trait;
use log::{debug, warn};
use redis::aio::{Connection, MultiplexedConnection};
use redis::AsyncCommands;

/// Seconds a single `BLPOP` blocks before checking back
const RECEIVE_BLOCK_SECS: usize = 1;

/// Reply channel provider using [Redis Lists](https://redis.io/topics/data-types#lists)
pub struct RedisReplyChannelProvider<F: RedisFactory> {
    factory: F,
}

impl<F: RedisFactory> RedisReplyChannelProvider<F> {
    /// Creates a new instance from a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> ReplyChannelProvider for RedisReplyChannelProvider<F>
where
    F: RedisFactory + Send + Sync,
{
    type Channel = RedisReplyChannel;

    /// Claims the binding marker with `SET NX EX` and connects for blocking reads
    async fn open(&self, location: &str) -> Result<Self::Channel, BoxedError> {
        let mut shared = self.factory.shared().await?;

        let claimed: Option<String> = redis::cmd("SET")
            .arg(binding_key(location))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(BINDING_TTL_SECS)
            .query_async(&mut shared)
            .await?;

        if claimed.is_none() {
            return Err(RedisQueueError::AlreadyBound(location.to_owned()).into());
        }

        let con = match self.factory.owned().await {
            Ok(con) => con,
            Err(e) => {
                unbind(&mut shared, location).await.ok();
                return Err(e);
            }
        };

        Ok(RedisReplyChannel {
            con,
            shared,
            location: location.to_owned(),
            closed: false,
        })
    }
}

async fn unbind(con: &mut MultiplexedConnection, location: &str) -> EmptyResult {
    con.del::<_, ()>(&[binding_key(location), response_key(location)])
        .await?;

    Ok(())
}

/// Exclusive reply channel backed by a redis list
///
/// Dropping the channel without closing it unbinds it in a background task.
pub struct RedisReplyChannel {
    con: Connection,
    shared: MultiplexedConnection,
    location: String,
    closed: bool,
}

#[async_trait]
impl RawReplyChannel for RedisReplyChannel {
    async fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, BoxedError> {
        let key = response_key(&self.location);

        while !self.closed {
            let popped: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
                .arg(&key)
                .arg(RECEIVE_BLOCK_SECS)
                .query_async(&mut self.con)
                .await?;

            if let Some((_, payload)) = popped {
                return Ok(Some(payload));
            }
        }

        Ok(None)
    }

    async fn close(&mut self) -> EmptyResult {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        unbind(&mut self.shared, &self.location).await
    }
}

impl JsonReplyChannel for RedisReplyChannel {}

impl Drop for RedisReplyChannel {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        let mut shared = self.shared.clone();
        let location = std::mem::take(&mut self.location);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match unbind(&mut shared, &location).await {
                        Ok(_) => debug!("Unbound abandoned reply channel {}", location),
                        Err(e) => warn!("Failed to unbind reply channel {}: {}", location, e),
                    }
                });
            }
            Err(_) => warn!(
                "Reply channel {} dropped outside of a runtime, binding expires on its own",
                location
            ),
        }
    }
}
