use crate::library::communication::event::QueueDescriptor;
use crate::library::communication::request::{Request, RequestError, Requestor};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct ExpectedRequest {
    serialized: Value,
    queue: QueueDescriptor,
    response: Option<Value>,
}

/// Requestor answering expected requests with scripted responses
///
/// An expectation without a response lets the request time out.
#[derive(Clone, Default)]
pub struct MockRequestor {
    remaining: Arc<AtomicUsize>,
    expected: Arc<Mutex<VecDeque<ExpectedRequest>>>,
}

impl MockRequestor {
    /// Expects the given request next and answers it with the response, or lets it time out if there is none
    pub fn expect_and_respond<R>(&self, request: &R, response: Option<R::Response>) -> &Self
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync,
    {
        let serialized = serde_json::to_value(request).unwrap();
        let response = response.map(|r| serde_json::to_value(r).unwrap());

        self.expected.lock().unwrap().push_back(ExpectedRequest {
            serialized,
            queue: R::queue(),
            response,
        });

        self.remaining.fetch_add(1, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Requestor for MockRequestor {
    async fn request<R>(&self, request: &R, timeout: Duration) -> Result<R::Response, RequestError>
    where
        R: Request + Send + Sync,
        R::Response: Send + Sync + 'static,
    {
        self.remaining.fetch_sub(1, Ordering::SeqCst);

        let expected = self.expected.lock().unwrap().pop_front();

        match expected {
            Some(expected) => {
                assert_eq!(
                    expected.queue,
                    R::queue(),
                    "Request queue (right) did not match expectation (left)"
                );

                let deserialized_expected: R = serde_json::from_value(expected.serialized)
                    .map_err(|e| RequestError::SendingFailure(Box::new(e)))?;

                assert_eq!(deserialized_expected, *request);

                match expected.response {
                    Some(response) => Ok(serde_json::from_value(response)
                        .expect("Failed to deserialize response")),
                    None => Err(RequestError::Timeout(timeout)),
                }
            }
            None => panic!("Received unexpected request on {:?}: {:?}", R::queue(), request),
        }
    }
}

impl Drop for MockRequestor {
    fn drop(&mut self) {
        // Clones share the counter, only the last one checks it
        if !std::thread::panicking() && Arc::strong_count(&self.remaining) == 1 {
            let remaining = self.remaining.load(Ordering::SeqCst);

            if remaining > 0 {
                panic!(
                    "MockRequestor was dropped with {} expected requests remaining",
                    remaining
                );
            }
        }
    }
}
