//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! This module allows implementors of traits that allow raw access to underlying messaging systems
//! to provide the higher-level traits relying on serialization. It does so by providing a number of
//! marker traits which, when implemented, provide default implementations of the higher-level traits
//! by translating between lower-level serialized data and higher-level strongly typed data by using
//! [`serde_json`].

use super::super::event::{
    Notification, NotificationPublisher, QueueEntry, RawNotificationPublisher, RawQueueEntry,
};
use super::super::request::{
    RawReplyChannel, RawResponsePublisher, ReplyChannel, ReplyChannelError, ResponsePublisher,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Marker trait providing a default [`NotificationPublisher`] implementation based on [`serde_json`]
pub trait JsonNotificationPublisher: RawNotificationPublisher + Send + Sync {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: JsonNotificationPublisher,
{
    /// Serializes the notification using [`serde_json::to_vec`]
    async fn publish<N: Notification + Send + Sync>(&self, notification: &N) -> EmptyResult {
        let data = serde_json::to_vec(notification)?;
        self.publish_raw(&data, N::queue()).await
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on [`serde_json`]
pub trait JsonQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: JsonQueueEntry,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>,
    {
        serde_json::from_slice(self.payload()).map_err(Into::into)
    }
}

/// Marker trait providing a default [`ReplyChannel`] implementation based on [`serde_json`]
pub trait JsonReplyChannel: RawReplyChannel + Send + Sync {}

#[async_trait]
impl<C> ReplyChannel for C
where
    C: JsonReplyChannel,
{
    /// Parses the payload using [`serde_json::from_slice`]
    async fn receive<R: DeserializeOwned + Send>(
        &mut self,
    ) -> Result<Option<R>, ReplyChannelError> {
        match self.receive_raw().await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| ReplyChannelError::Malformed(e.into())),
            Ok(None) => Ok(None),
            Err(e) => Err(ReplyChannelError::Transport(e)),
        }
    }

    async fn close(&mut self) -> EmptyResult {
        RawReplyChannel::close(self).await
    }
}

/// Marker trait providing a default [`ResponsePublisher`] implementation based on [`serde_json`]
pub trait JsonResponsePublisher: RawResponsePublisher + Send + Sync {}

#[async_trait]
impl<P> ResponsePublisher for P
where
    P: JsonResponsePublisher,
{
    /// Serializes the response using [`serde_json::to_vec`]
    async fn publish<R: Serialize + Send + Sync>(&self, response: &R, location: &str) -> EmptyResult {
        let data = serde_json::to_vec(response)?;
        self.publish_raw(&data, location).await
    }
}
