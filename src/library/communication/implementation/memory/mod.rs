//! Process-local broker implementing all traits from this module
//!
//! The broker mirrors the semantics of an AMQP broker closely enough to run the request/reply
//! protocol without any infrastructure. Exchanges route published notifications to every queue
//! bound with a matching routing key, durable queues track unacknowledged deliveries and hand
//! them back when their entry is dropped unsettled, and reply channels are exclusive, addressed
//! by name and silently drop anything published to an unbound address.
//!
//! Outages can be simulated with [`MemoryBroker::set_available`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

mod factory;
mod queue;
mod reply;

pub use queue::*;
pub use reply::*;

/// Errors returned by the [`MemoryBroker`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MemoryBrokerError {
    /// The broker has been switched off
    #[error("broker is unavailable")]
    Unavailable,
    /// A reply channel is already bound to the address
    #[error("reply address {0} is already bound")]
    AlreadyBound(String),
    /// The delivery has been settled before
    #[error("delivery {0} has already been settled")]
    AlreadySettled(u64),
}

struct Delivery {
    tag: u64,
    payload: Vec<u8>,
}

struct Queue {
    limit: usize,
    ready: VecDeque<Delivery>,
    unacked: HashMap<u64, Delivery>,
    notify: Arc<Notify>,
}

impl Queue {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            ready: VecDeque::new(),
            unacked: HashMap::new(),
            notify: Arc::new(Notify::new()),
        }
    }

    fn push(&mut self, delivery: Delivery) {
        self.ready.push_back(delivery);

        while self.limit > 0 && self.ready.len() > self.limit {
            self.ready.pop_front();
        }

        self.notify.notify_one();
    }

    fn requeue(&mut self, tag: u64) -> bool {
        match self.unacked.remove(&tag) {
            Some(delivery) => {
                self.ready.push_front(delivery);
                self.notify.notify_one();
                true
            }
            None => false,
        }
    }
}

struct State {
    available: bool,
    next_tag: u64,
    /// exchange -> routing key -> bound queues
    exchanges: HashMap<String, HashMap<String, HashSet<String>>>,
    queues: HashMap<String, Queue>,
    replies: HashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            available: true,
            next_tag: 1,
            exchanges: HashMap::new(),
            queues: HashMap::new(),
            replies: HashMap::new(),
        }
    }
}

impl State {
    fn ensure_available(&self) -> Result<(), MemoryBrokerError> {
        if self.available {
            Ok(())
        } else {
            Err(MemoryBrokerError::Unavailable)
        }
    }
}

/// Handle to a shared in-memory broker
///
/// Cloning the handle yields another connection to the same broker.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
    replies_changed: Arc<Notify>,
}

impl MemoryBroker {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switches the broker on or off. While off, declaring, publishing and binding fails.
    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Number of reply channels currently bound
    pub fn bound_reply_channels(&self) -> usize {
        self.state().replies.len()
    }

    /// Whether a reply channel is bound to the given address
    pub fn is_bound(&self, location: &str) -> bool {
        self.state().replies.contains_key(location)
    }

    /// Waits until a reply channel has been bound to the given address
    pub async fn wait_for_reply_channel(&self, location: &str) {
        loop {
            let changed = self.replies_changed.notified();

            if self.is_bound(location) {
                return;
            }

            changed.await;
        }
    }

    /// Number of entries in a queue, both waiting for delivery and delivered but unsettled
    pub fn queue_len(&self, queue: &str) -> usize {
        self.state()
            .queues
            .get(queue)
            .map(|q| q.ready.len() + q.unacked.len())
            .unwrap_or_default()
    }
}
