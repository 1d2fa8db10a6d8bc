//! Structures to send requests and reply to them
//!
//! Each call made by a [`Requestor`] owns a private reply channel which is bound before the
//! request is published and unbound once the call resolves, no matter whether it resolved
//! with a reply, ran into its deadline, failed to publish or was abandoned by the caller.
//! Replies are matched to their call through the correlation identifier carried by both the
//! [`Request`] and its [`Response`] and are tracked in a [`CorrelationTable`].
//!
//! On the other end, a [`Responder`] consumes requests from their shared queue, lets a
//! [`RequestProcessor`] produce a response and publishes it to the reply address of the
//! request before acknowledging it.

mod pending;
mod publisher;
mod reply_channel;
#[allow(clippy::module_inception)]
mod request;
mod requestor;
mod responder;

pub use pending::*;
pub use publisher::*;
pub use reply_channel::*;
pub use request::*;
pub use requestor::*;
pub use responder::*;
