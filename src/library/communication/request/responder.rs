use super::super::super::BoxedError;
use super::super::event::{Consumer, ConsumerError};
use super::{Request, ResponsePublisher};
use async_trait::async_trait;
use log::debug;
use std::marker::PhantomData;
use thiserror::Error;

/// Error that may be thrown while responding to a request
#[derive(Error, Debug)]
pub enum ResponderError {
    /// The [`RequestProcessor`] threw an error
    #[error("processing request failed")]
    ProcessingFailed(#[source] BoxedError),
    /// Unable to deliver the response
    #[error("sending response failed")]
    ResponseUndeliverable(#[source] BoxedError),
}

/// Structure which processes requests and produces responses
///
/// Failures concerning the subject of a request should be expressed in the response itself.
/// An error returned from [`process`](RequestProcessor::process) drops the request.
#[async_trait]
pub trait RequestProcessor {
    /// Type of request to process
    type Request: Request;

    /// Handler for requests, returning a response
    async fn process(
        &self,
        request: Self::Request,
    ) -> Result<<Self::Request as Request>::Response, BoxedError>;
}

/// Convenience wrapper to process requests and send responses
///
/// Acting as a [`Consumer`], the request is only settled once the response has been published.
/// When the response can not be delivered, the request is handed back to the queue.
pub struct Responder<R, C, P> {
    processor: C,
    publisher: P,
    request: PhantomData<fn() -> R>,
}

impl<R, C, P> Responder<R, C, P>
where
    R: Request,
    C: RequestProcessor<Request = R>,
    P: ResponsePublisher,
{
    /// Creates a new responder from raw parts
    pub fn new(processor: C, publisher: P) -> Self {
        Self {
            processor,
            publisher,
            request: PhantomData,
        }
    }
}

#[async_trait]
impl<R, C, P> Consumer for Responder<R, C, P>
where
    R: Request + Send + Sync,
    R::Response: Send + Sync,
    C: RequestProcessor<Request = R> + Send + Sync,
    P: ResponsePublisher + Send + Sync,
{
    type Notification = R;

    async fn consume(&self, request: Self::Notification) -> Result<(), ConsumerError> {
        let location = request.reply_to().to_owned();
        let correlation_id = request.correlation_id().to_owned();

        let response = self.processor.process(request).await.map_err(|e| {
            ConsumerError::Permanent(ResponderError::ProcessingFailed(e).into())
        })?;

        self.publisher
            .publish(&response, &location)
            .await
            .map_err(|e| ConsumerError::Transient(ResponderError::ResponseUndeliverable(e).into()))?;

        debug!("Replied to {} on {}", correlation_id, location);

        Ok(())
    }
}
