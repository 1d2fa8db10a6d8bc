use super::super::super::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error type for receiving replies
#[derive(Error, Debug)]
pub enum ReplyChannelError {
    /// The channel could not be read from
    #[error("reply channel transport failed")]
    Transport(#[source] BoxedError),
    /// A reply has been received but could not be decoded
    #[error("malformed reply")]
    Malformed(#[source] BoxedError),
}

/// Exclusive channel bound to a single reply address that yields raw replies
///
/// The channel stays bound until it is closed. Implementations unbind it on a best-effort
/// basis when it is dropped without being closed first.
#[async_trait]
pub trait RawReplyChannel {
    /// Waits for the next raw reply, returning `None` once the channel has been unbound
    async fn receive_raw(&mut self) -> Result<Option<Vec<u8>>, BoxedError>;

    /// Unbinds and deletes the channel, dropping any reply that arrives afterwards
    async fn close(&mut self) -> EmptyResult;
}

/// Exclusive channel yielding typed replies
#[async_trait]
pub trait ReplyChannel {
    /// Waits for the next reply and decodes it
    async fn receive<R: DeserializeOwned + Send>(&mut self)
        -> Result<Option<R>, ReplyChannelError>;

    /// Unbinds and deletes the channel
    async fn close(&mut self) -> EmptyResult;
}

/// Binds exclusive reply channels
#[async_trait]
pub trait ReplyChannelProvider {
    /// Type of [`ReplyChannel`] handed out
    type Channel: ReplyChannel + Send + Sync;

    /// Binds a new channel to the given address, failing if the address is already bound
    async fn open(&self, location: &str) -> Result<Self::Channel, BoxedError>;
}
