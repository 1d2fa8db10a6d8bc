use super::super::super::super::{BoxedError, EmptyResult};
use super::super::super::event::{QueueDescriptor, QueueProvider};
use super::{RedisFactory, RedisQueueEntry, STREAM_ID_ADDITIONS, STREAM_ID_HEAD};
use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use log::warn;
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use std::convert::TryInto;
use std::time::Duration;
use tokio::time::sleep;

const BUSY_GROUP: &str = "BUSYGROUP";
const NO_GROUP: &str = "NOGROUP";

const READ_RETRY_BASE: Duration = Duration::from_millis(100);
const READ_RETRY_MAX: Duration = Duration::from_secs(5);

/// Queue provider implementation using [Redis Streams](https://redis.io/topics/streams-intro)
pub struct RedisQueueProvider<F: RedisFactory + Send + Sync> {
    factory: F,
}

impl<F: RedisFactory + Send + Sync> RedisQueueProvider<F> {
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> QueueProvider for RedisQueueProvider<F>
where
    F: RedisFactory + Send + Sync,
{
    type Entry = RedisQueueEntry<MultiplexedConnection>;

    /// Creates the stream and a consumer group named after the queue, starting at the stream head
    async fn declare(&self, queue: &QueueDescriptor) -> EmptyResult {
        let mut con = self.factory.shared().await?;
        create_consumer_group(&mut con, &queue.key(), queue.queue()).await
    }

    /// Consumes a redis stream data structure using the following steps:
    ///
    /// 1. Create the stream and/or consumer group if it does not exist
    /// 2. Start streaming entries from the PEL until the queue head is reached
    /// 3. Wait for and stream new entries in a blocking manner
    /// 4. Bail if no messages has been received within `idle_timeout` or block indefinitely
    async fn consume(
        &self,
        queue: QueueDescriptor,
        consumer: &str,
        batch_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = queue.key();
        let group = queue.queue().to_owned();

        self.declare(&queue).await?;

        // Create a redis connection for the blocking XREADGROUP command
        let con = self.factory.owned().await?;

        let block_duration = idle_timeout
            .map(|d| d.as_millis().try_into().unwrap_or_default())
            .unwrap_or_default();

        let read_options = StreamReadOptions::default()
            .group(&group, consumer)
            .count(batch_size)
            .block(block_duration);

        let entry_stream = xread_stream(con, read_options, key.clone(), group.clone());

        // Entries settle themselves through the shared connection
        let ack_con = self.factory.shared().await?;
        let limit = queue.limit();

        let stream = entry_stream
            .map(move |entry| -> Result<RedisQueueEntry<MultiplexedConnection>, BoxedError> {
                let entry = RedisQueueEntry::new(
                    ack_con.clone(),
                    entry?,
                    key.clone(),
                    group.clone(),
                    limit,
                )?;

                Ok(entry)
            })
            .boxed();

        Ok(stream)
    }
}

async fn create_consumer_group<C: ConnectionLike + Send>(
    con: &mut C,
    key: &str,
    group: &str,
) -> EmptyResult {
    match con
        .xgroup_create_mkstream::<_, _, _, ()>(key, group, STREAM_ID_HEAD)
        .await
    {
        Err(e) if e.code() != Some(BUSY_GROUP) => Err(e.into()),
        _ => Ok(()),
    }
}

fn xread_stream<'a, C: ConnectionLike + Send + Sync + 'a>(
    con: C,
    options: StreamReadOptions,
    key: String,
    group: String,
) -> BoxStream<'a, RedisResult<StreamId>> {
    let initial_id: String = STREAM_ID_HEAD.to_string();
    let seed = (con, options, initial_id, 0u32);

    let stream = stream::unfold(seed, move |(mut con, options, id, failures)| {
        let key = key.to_owned();
        let group = group.to_owned();

        async move {
            if failures > 0 {
                sleep(read_backoff(failures)).await;
            }

            let result = con
                .xread_options::<_, _, StreamReadReply>(&[&key], &[&id], &options)
                .await;

            match result {
                Ok(mut reply) => {
                    let stream = reply.keys.pop().filter(|stream| stream.key == key)?;

                    // If we are already operating on "latest" then continue doing so
                    if id == STREAM_ID_ADDITIONS {
                        Some((Ok(stream.ids), (con, options, id, 0)))
                    }
                    // If we are processing pending messages after a crash and have more, run through them
                    else if let Some(next_id) = stream.ids.last().map(|entry| entry.id.to_owned())
                    {
                        Some((Ok(stream.ids), (con, options, next_id, 0)))
                    }
                    // If we have finished processing pending messages after a crash, move to "latest"
                    else {
                        Some((
                            Ok(stream.ids),
                            (con, options, STREAM_ID_ADDITIONS.to_string(), 0),
                        ))
                    }
                }
                Err(e) => {
                    // The group vanishes when redis restarts without persistence
                    if e.code() == Some(NO_GROUP) {
                        warn!("Consumer group {} on {} is gone, recreating it", group, key);

                        if let Err(e) = create_consumer_group(&mut con, &key, &group).await {
                            warn!("Failed to recreate consumer group {}: {}", group, e);
                        }
                    }

                    Some((Err(e), (con, options, id, failures.saturating_add(1))))
                }
            }
        }
    });

    // Entries are read in batches but yielded one at a time
    stream
        .flat_map(|result: RedisResult<Vec<StreamId>>| match result {
            Ok(batch) => stream::iter(batch).map(Ok).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
}

/// Delay before the next read after `failures` consecutive failed ones
fn read_backoff(failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.saturating_sub(1));
    READ_RETRY_BASE.saturating_mul(factor).min(READ_RETRY_MAX)
}

#[cfg(test)]
mod does {
    use super::super::STREAM_PAYLOAD_KEY;
    use super::*;
    use pretty_assertions::assert_eq;
    use redis::{Cmd, ErrorKind, Pipeline, RedisError, RedisFuture, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const KEY: &str = "catalog.article_exist";
    const GROUP: &str = "article_exist_queue";

    /// Connection replaying scripted replies while recording the commands it receives
    #[derive(Clone, Default)]
    struct ScriptedConnection {
        replies: Arc<Mutex<VecDeque<RedisResult<Value>>>>,
        commands: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedConnection {
        fn new(replies: Vec<RedisResult<Value>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                commands: Arc::default(),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl ConnectionLike for ScriptedConnection {
        fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
            let packed = String::from_utf8_lossy(&cmd.get_packed_command()).into_owned();
            self.commands.lock().unwrap().push(packed);

            // An empty reply ends the stream once the script is exhausted
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Value::Bulk(Vec::new())));

            Box::pin(async move { reply })
        }

        fn req_packed_commands<'a>(
            &'a mut self,
            _cmd: &'a Pipeline,
            _offset: usize,
            _count: usize,
        ) -> RedisFuture<'a, Vec<Value>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn get_db(&self) -> i64 {
            0
        }
    }

    fn batch(id: &str) -> RedisResult<Value> {
        Ok(Value::Bulk(vec![Value::Bulk(vec![
            Value::Data(KEY.into()),
            Value::Bulk(vec![Value::Bulk(vec![
                Value::Data(id.into()),
                Value::Bulk(vec![
                    Value::Data(STREAM_PAYLOAD_KEY.into()),
                    Value::Data(b"{}".to_vec()),
                ]),
            ])]),
        ])]))
    }

    fn read(con: ScriptedConnection) -> BoxStream<'static, RedisResult<StreamId>> {
        let options = StreamReadOptions::default().group(GROUP, "responder");
        xread_stream(con, options, KEY.to_owned(), GROUP.to_owned())
    }

    #[tokio::test]
    async fn keep_reading_after_read_error() {
        let con = ScriptedConnection::new(vec![
            Err(RedisError::from((ErrorKind::IoError, "connection reset"))),
            batch("1-0"),
        ]);

        let items: Vec<_> = read(con).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().id, "1-0");
    }

    #[tokio::test]
    async fn recreate_vanished_consumer_group() {
        let no_group = redis::parse_redis_value(b"-NOGROUP No such key or consumer group\r\n");
        assert!(matches!(&no_group, Err(e) if e.code() == Some(NO_GROUP)));

        let con = ScriptedConnection::new(vec![no_group, Ok(Value::Okay), batch("1-0")]);
        let items: Vec<_> = read(con.clone()).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_ref().unwrap().id, "1-0");

        let commands = con.commands();
        assert!(commands[0].contains("XREADGROUP"));
        assert!(commands[1].contains("XGROUP"));
        assert!(commands[1].contains(GROUP));
        assert!(commands[2].contains("XREADGROUP"));
    }

    #[test]
    fn back_off_exponentially_up_to_a_limit() {
        assert_eq!(read_backoff(1), READ_RETRY_BASE);
        assert_eq!(read_backoff(2), READ_RETRY_BASE * 2);
        assert_eq!(read_backoff(64), READ_RETRY_MAX);
    }
}
