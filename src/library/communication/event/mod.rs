//! Structures to publish and reliably consume notifications
//!
//! A [`Notification`] is published to an exchange under a routing key. The exchange
//! forwards it to every queue bound with that routing key. Queues are durable and shared:
//! any number of consumers may attach to the same queue and each entry is handed to
//! exactly one of them (competing consumers), which gives simple load balancing and
//! dynamic scalability.
//!
//! Every [`QueueEntry`] has to be settled once processing concludes. Acknowledging removes
//! it for good, rejecting either drops it or puts it back for redelivery. Entries that were
//! delivered but never settled (e.g. because the consumer crashed) are delivered again,
//! which makes consumption at-least-once.

mod consumer;
mod notification;
mod publisher;
mod queue;
mod queue_provider;

pub use consumer::*;
pub use notification::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
