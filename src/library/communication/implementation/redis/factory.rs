use super::super::super::super::BoxedError;
use async_trait::async_trait;
use redis::aio::{Connection, MultiplexedConnection};

/// Factory for redis connections
#[async_trait]
pub trait RedisFactory {
    /// Clones a connection shared by all users which must not be used for blocking commands
    async fn shared(&self) -> Result<MultiplexedConnection, BoxedError>;

    /// Establishes an individual connection that may be used for long-running, blocking commands
    async fn owned(&self) -> Result<Connection, BoxedError>;
}
