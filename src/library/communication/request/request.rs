use super::super::event::Notification;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use uuid::Uuid;

/// Name of an exclusive reply channel
///
/// Every call binds its own channel under a freshly generated name. It may receive at most
/// one meaningful reply and is destroyed as soon as the call resolves.
pub type ResponseLocation = String;

/// Opaque token linking a reply to the request that caused it
pub type CorrelationId = String;

const RESPONSE_LOCATION_PREFIX: &str = "reply.";

/// Generates a new, never before used reply channel name
pub fn generate_response_location() -> ResponseLocation {
    format!("{}{}", RESPONSE_LOCATION_PREFIX, Uuid::new_v4())
}

/// Generates a new, globally unique correlation identifier
pub fn generate_correlation_id() -> CorrelationId {
    Uuid::new_v4().to_string()
}

/// Query for information which can be replied to
///
/// Requests should not have side effects! The request may get redelivered to a responder
/// and a reply may get lost, thus processing the same request twice has to be harmless.
pub trait Request: Notification {
    /// Expected response type
    type Response: Response + Serialize + DeserializeOwned + Debug + PartialEq;

    /// Identifier the matching response has to carry
    fn correlation_id(&self) -> &str;

    /// Location where a reply should be sent to
    fn reply_to(&self) -> &str;
}

/// Reply to a [`Request`]
pub trait Response {
    /// Identifier of the request this is a response to
    fn correlation_id(&self) -> &str;
}
