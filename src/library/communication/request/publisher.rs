use super::super::super::EmptyResult;
use async_trait::async_trait;
use serde::Serialize;

/// Structure which allows publishing of serialized data to reply channels
#[async_trait]
pub trait RawResponsePublisher {
    /// Sends an opaque payload to a reply address
    ///
    /// Delivering to an address without a bound channel is not an error, the payload is dropped.
    async fn publish_raw(&self, data: &[u8], location: &str) -> EmptyResult;
}

/// Publisher for responses
#[async_trait]
pub trait ResponsePublisher {
    /// Publishes a response to a reply address
    async fn publish<R: Serialize + Send + Sync>(&self, response: &R, location: &str)
        -> EmptyResult;
}
