use super::super::super::super::EmptyResult;
use super::super::json::JsonQueueEntry;
use super::RedisQueueError;
use super::{STREAM_ID_NEW, STREAM_PAYLOAD_KEY};
use crate::library::communication::event::RawQueueEntry;
use async_trait::async_trait;
use redis::aio::ConnectionLike;
use redis::streams::{StreamId, StreamMaxlen};

/// Redis based implementation of the [`QueueEntry`](crate::library::communication::event::QueueEntry) trait
///
/// Entries that are never settled remain in the pending entries list of the consumer and are
/// delivered again once it reconnects.
pub struct RedisQueueEntry<C> {
    con: C,
    id: String,
    key: String,
    group: String,
    limit: usize,
    payload: Vec<u8>,
}

impl<C> RedisQueueEntry<C>
where
    C: ConnectionLike + Send + Sync,
{
    pub(super) fn new(
        con: C,
        entry: StreamId,
        key: String,
        group: String,
        limit: usize,
    ) -> Result<Self, RedisQueueError> {
        let payload = entry
            .get(STREAM_PAYLOAD_KEY)
            .ok_or(RedisQueueError::MissingPayload)?;

        Ok(Self {
            con,
            id: entry.id,
            key,
            group,
            limit,
            payload,
        })
    }
}

#[async_trait]
impl<C> RawQueueEntry for RedisQueueEntry<C>
where
    C: ConnectionLike + Send + Sync,
{
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        redis::cmd("XACK")
            .arg(&self.key)
            .arg(&self.group)
            .arg(&self.id)
            .query_async::<_, ()>(&mut self.con)
            .await?;

        Ok(())
    }

    /// Requeueing appends a copy of the entry to the stream before acknowledging the original
    async fn reject(&mut self, requeue: bool) -> EmptyResult {
        if requeue {
            redis::cmd("XADD")
                .arg(&self.key)
                .arg(StreamMaxlen::Approx(self.limit))
                .arg(STREAM_ID_NEW)
                .arg(STREAM_PAYLOAD_KEY)
                .arg(&self.payload)
                .query_async::<_, ()>(&mut self.con)
                .await?;
        }

        self.acknowledge().await
    }
}

impl<C> JsonQueueEntry for RedisQueueEntry<C> where C: ConnectionLike + Send + Sync {}
