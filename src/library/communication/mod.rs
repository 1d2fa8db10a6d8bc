//! Structures to communicate between services through a message broker
//!
//! In general, there are two modes of operation:
//!
//! 1. Publish and consume
//! 2. Request and reply
//!
//! The first is the foundation. A notification implements the [`Notification`](event::Notification)
//! trait which describes, in a type-safe manner, on which [`Queue`](event::QueueDescriptor) it travels.
//! Publishers hand it to an exchange under a routing key and one consumer out of a group
//! of competing consumers sharing the bound queue receives it. Every delivery has to be
//! settled by either acknowledging or rejecting it. For more details, consult the [`event`] module.
//!
//! The second mode builds on top of the first. A [`Request`](request::Request) is a notification
//! which additionally carries a correlation identifier and the address of a reply channel.
//! The requesting side binds an exclusive, short-lived reply channel for every call, publishes
//! the request and waits a bounded amount of time for the single reply carrying its correlation
//! identifier. The responding side consumes requests like any other notification and publishes
//! its reply straight to the reply channel. Consult the [`request`] module for the details.

mod communication_factory;

pub mod event;
pub mod implementation;
pub mod request;

pub use communication_factory::CommunicationFactory;
