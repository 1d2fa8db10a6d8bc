use super::{CorrelationId, ResponseLocation};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Type erased response value stored in a [`CorrelationTable`] shared by multiple request types
pub type ErasedResponse = Box<dyn Any + Send>;

/// Error returned when registering a pending call fails
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PendingCallError {
    /// Another call with the same correlation identifier is still in flight
    #[error("a call with correlation id {0} is already pending")]
    DuplicateCorrelation(CorrelationId),
}

struct PendingCall<T> {
    reply_to: ResponseLocation,
    slot: oneshot::Sender<T>,
}

type CallMap<T> = HashMap<CorrelationId, PendingCall<T>>;

/// Concurrent registry of calls awaiting their reply, keyed by correlation identifier
///
/// At most one call may be registered per correlation identifier. Each call owns a single
/// assignment completion slot: the first value delivered for it resolves the call and every
/// later delivery is ignored. Entries are removed when their [`PendingSlot`] is dropped,
/// so an abandoned call can never linger in the table.
pub struct CorrelationTable<T> {
    calls: Arc<Mutex<CallMap<T>>>,
}

impl<T> Clone for CorrelationTable<T> {
    fn clone(&self) -> Self {
        Self {
            calls: self.calls.clone(),
        }
    }
}

impl<T> Default for CorrelationTable<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> CorrelationTable<T> {
    /// Registers a new call that has to resolve before the given deadline
    pub fn register(
        &self,
        correlation_id: &str,
        reply_to: &str,
        deadline: Instant,
    ) -> Result<PendingSlot<T>, PendingCallError> {
        let mut calls = lock(&self.calls);

        if calls.contains_key(correlation_id) {
            return Err(PendingCallError::DuplicateCorrelation(
                correlation_id.to_owned(),
            ));
        }

        let (tx, rx) = oneshot::channel();
        calls.insert(
            correlation_id.to_owned(),
            PendingCall {
                reply_to: reply_to.to_owned(),
                slot: tx,
            },
        );

        Ok(PendingSlot {
            correlation_id: correlation_id.to_owned(),
            deadline,
            receiver: rx,
            calls: self.calls.clone(),
        })
    }

    /// Fulfills the call with the given correlation identifier.
    ///
    /// Returns `false` if no such call is pending (anymore) which happens for duplicate
    /// or late deliveries, in which case the value is discarded.
    pub fn complete(&self, correlation_id: &str, value: T) -> bool {
        let call = lock(&self.calls).remove(correlation_id);

        match call {
            Some(call) => call.slot.send(value).is_ok(),
            None => false,
        }
    }

    /// Reply channel registered for a pending call
    pub fn reply_location(&self, correlation_id: &str) -> Option<ResponseLocation> {
        lock(&self.calls)
            .get(correlation_id)
            .map(|call| call.reply_to.clone())
    }

    /// Number of calls that are currently awaiting a reply
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

/// Receiving half of a registered call
///
/// Dropping it removes the call from its table.
pub struct PendingSlot<T> {
    correlation_id: CorrelationId,
    deadline: Instant,
    receiver: oneshot::Receiver<T>,
    calls: Arc<Mutex<CallMap<T>>>,
}

impl<T> PendingSlot<T> {
    /// Correlation identifier of the call
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Point in time after which the call is considered unanswered
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits for the value the call is completed with
    pub async fn fulfilled(&mut self) -> Option<T> {
        (&mut self.receiver).await.ok()
    }
}

impl<T> Drop for PendingSlot<T> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.correlation_id);
    }
}

fn lock<T>(calls: &Mutex<CallMap<T>>) -> MutexGuard<'_, CallMap<T>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod does {
    use super::*;
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    #[tokio::test]
    async fn resolve_with_first_value() {
        let table = CorrelationTable::<u32>::default();
        let mut slot = table.register("a", "reply.a", deadline()).unwrap();

        assert!(table.complete("a", 1));
        assert!(!table.complete("a", 2));

        assert_eq!(slot.fulfilled().await, Some(1));
    }

    #[tokio::test]
    async fn reject_duplicate_registration() {
        let table = CorrelationTable::<u32>::default();
        let _slot = table.register("a", "reply.a", deadline()).unwrap();

        assert_eq!(
            table.register("a", "reply.b", deadline()).err(),
            Some(PendingCallError::DuplicateCorrelation("a".into()))
        );
        assert_eq!(table.reply_location("a"), Some("reply.a".into()));
    }

    #[tokio::test]
    async fn forget_reply_location_once_completed() {
        let table = CorrelationTable::<u32>::default();
        let _slot = table.register("a", "reply.a", deadline()).unwrap();

        assert!(table.complete("a", 1));
        assert_eq!(table.reply_location("a"), None);
    }

    #[tokio::test]
    async fn remove_entry_when_slot_is_dropped() {
        let table = CorrelationTable::<u32>::default();
        let slot = table.register("a", "reply.a", deadline()).unwrap();
        assert_eq!(table.in_flight(), 1);

        drop(slot);

        assert_eq!(table.in_flight(), 0);
        assert!(!table.complete("a", 1));
    }

    #[tokio::test]
    async fn isolate_calls() {
        let table = CorrelationTable::<u32>::default();
        let mut first = table.register("a", "reply.a", deadline()).unwrap();
        let mut second = table.register("b", "reply.b", deadline()).unwrap();

        assert!(table.complete("b", 2));
        assert!(table.complete("a", 1));

        assert_eq!(first.fulfilled().await, Some(1));
        assert_eq!(second.fulfilled().await, Some(2));
    }
}
