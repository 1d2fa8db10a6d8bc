use super::super::super::BoxedError;
use super::super::event::NotificationPublisher;
use super::{
    CorrelationTable, ErasedResponse, PendingCallError, PendingSlot, ReplyChannel,
    ReplyChannelError, ReplyChannelProvider, Request, Response,
};
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

/// Error type for sending requests
#[derive(Error, Debug)]
pub enum RequestError {
    /// The reply channel could not be bound
    #[error("unable to bind reply channel")]
    ChannelUnavailable(#[source] BoxedError),
    /// Another call with the same correlation identifier is in flight
    #[error("duplicate correlation id")]
    DuplicateCorrelation(#[from] PendingCallError),
    /// Publishing of the request failed
    #[error("sending of request failed")]
    SendingFailure(#[source] BoxedError),
    /// No matching reply arrived in time
    #[error("no reply received within {0:?}")]
    Timeout(Duration),
    /// A reply arrived but could not be decoded
    #[error("malformed response")]
    MalformedResponse(#[source] BoxedError),
    /// The reply channel could not be read from
    #[error("response not receivable")]
    ReceptionFailed(#[source] BoxedError),
    /// The reply channel has been unbound while waiting on it
    #[error("reply channel closed unexpectedly")]
    ChannelClosed,
}

impl From<ReplyChannelError> for RequestError {
    fn from(e: ReplyChannelError) -> Self {
        match e {
            ReplyChannelError::Malformed(e) => RequestError::MalformedResponse(e),
            ReplyChannelError::Transport(e) => RequestError::ReceptionFailed(e),
        }
    }
}

/// Handler for sending requests and awaiting their reply
#[async_trait]
pub trait Requestor {
    /// Sends out a request and waits at most `timeout` for the matching response
    async fn request<R>(&self, request: &R, timeout: Duration) -> Result<R::Response, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static;
}

/// [`Requestor`] implementation by combining a [`NotificationPublisher`] and a [`ReplyChannelProvider`]
///
/// All calls made through one instance share a [`CorrelationTable`]. A reply that arrives on
/// any channel is dispatched to the call its correlation identifier belongs to.
pub struct CompositeRequestor<P, C> {
    publisher: P,
    channels: C,
    calls: CorrelationTable<ErasedResponse>,
}

impl<P, C> CompositeRequestor<P, C>
where
    P: NotificationPublisher,
    C: ReplyChannelProvider,
{
    /// Creates a new instance from raw parts
    pub fn new(publisher: P, channels: C) -> Self {
        Self {
            publisher,
            channels,
            calls: CorrelationTable::default(),
        }
    }

    /// Number of calls currently awaiting their reply
    pub fn in_flight(&self) -> usize {
        self.calls.in_flight()
    }
}

impl<P, C> CompositeRequestor<P, C>
where
    P: NotificationPublisher + Send + Sync,
    C: ReplyChannelProvider + Send + Sync,
{
    async fn call<R>(
        &self,
        request: &R,
        channel: &mut C::Channel,
        timeout: Duration,
    ) -> Result<R::Response, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        let deadline = Instant::now() + timeout;
        let mut slot = self
            .calls
            .register(request.correlation_id(), request.reply_to(), deadline)?;

        self.publisher
            .publish(request)
            .await
            .map_err(RequestError::SendingFailure)?;

        debug!(
            "Published request {} awaiting reply on {}",
            request.correlation_id(),
            request.reply_to()
        );

        match timeout_at(slot.deadline(), self.await_reply::<R>(&mut slot, channel)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RequestError::Timeout(timeout)),
        }
    }

    async fn await_reply<R>(
        &self,
        slot: &mut PendingSlot<ErasedResponse>,
        channel: &mut C::Channel,
    ) -> Result<R::Response, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        loop {
            tokio::select! {
                biased;

                value = slot.fulfilled() => {
                    return match value.map(|v| v.downcast::<R::Response>()) {
                        Some(Ok(response)) => Ok(*response),
                        Some(Err(_)) => Err(RequestError::MalformedResponse(
                            "reply of unexpected type".into(),
                        )),
                        None => Err(RequestError::ChannelClosed),
                    };
                }
                received = channel.receive::<R::Response>() => {
                    let response = received?.ok_or(RequestError::ChannelClosed)?;
                    let correlation_id = response.correlation_id().to_owned();

                    if !self.calls.complete(&correlation_id, Box::new(response)) {
                        warn!(
                            "Dropping reply with unknown correlation id {} (waiting for {} on {})",
                            correlation_id,
                            slot.correlation_id(),
                            self.calls
                                .reply_location(slot.correlation_id())
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<P, C> Requestor for CompositeRequestor<P, C>
where
    P: NotificationPublisher + Send + Sync,
    C: ReplyChannelProvider + Send + Sync,
{
    /// Binds the reply channel, registers the call, publishes the request and waits for the reply.
    ///
    /// The call is removed from the correlation table and the channel is closed on every exit path.
    async fn request<R>(&self, request: &R, timeout: Duration) -> Result<R::Response, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        let location = request.reply_to();

        let mut channel = self
            .channels
            .open(location)
            .await
            .map_err(RequestError::ChannelUnavailable)?;

        let outcome = self.call(request, &mut channel, timeout).await;

        if let Err(e) = channel.close().await {
            warn!("Failed to close reply channel {}: {}", location, e);
        }

        outcome
    }
}
