use super::super::{ArticleSummary, QUEUE_SIZE_LOOKUP};
use crate::library::communication::event::{Notification, QueueDescriptor};
use crate::library::communication::request::{
    generate_correlation_id, generate_response_location, CorrelationId, Request, Response,
    ResponseLocation,
};
use crate::library::helpers::bare_token;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const EXCHANGE: &str = "catalog";
const ROUTING_KEY: &str = "article_exist";
const QUEUE: &str = "article_exist_queue";

/// Diagnostic of a reply for an unknown article
pub const ERROR_NOT_FOUND: &str = "article not found";
/// Diagnostic of a reply for an article that exists but is disabled
pub const ERROR_DISABLED: &str = "article is disabled";
const ERROR_UNAVAILABLE_PREFIX: &str = "catalog unavailable";

/// Request to look up whether an article exists and is enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLookupRequest {
    /// Identifier of the article to look up
    pub article_id: String,

    /// Credential forwarded to the catalog, without authorization scheme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    correlation_id: CorrelationId,
    reply_address: ResponseLocation,
}

impl ArticleLookupRequest {
    /// Creates a new instance with a freshly minted correlation id and reply address.
    ///
    /// A leading `Bearer ` is stripped from the token and empty tokens are omitted.
    pub fn new(article_id: impl Into<String>, auth_token: Option<&str>) -> Self {
        Self {
            article_id: article_id.into(),
            auth_token: bare_token(auth_token),
            correlation_id: generate_correlation_id(),
            reply_address: generate_response_location(),
        }
    }
}

impl PartialEq for ArticleLookupRequest {
    fn eq(&self, other: &Self) -> bool {
        self.article_id == other.article_id && self.auth_token == other.auth_token
    }
}

impl Notification for ArticleLookupRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(
            EXCHANGE.into(),
            ROUTING_KEY.into(),
            QUEUE.into(),
            QUEUE_SIZE_LOOKUP,
        )
    }
}

impl Request for ArticleLookupRequest {
    type Response = ArticleLookupReply;

    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn reply_to(&self) -> &str {
        &self.reply_address
    }
}

/// Response to an [`ArticleLookupRequest`]
///
/// `exists` is only set for articles that were found and are enabled, in which case the
/// article is attached. Otherwise, `error` tells why the article could not be confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLookupReply {
    /// Identifier of the article that has been looked up
    pub article_id: String,
    /// Correlation identifier copied from the request
    pub correlation_id: CorrelationId,
    /// Whether the article exists and is enabled
    pub exists: bool,
    /// The article if it exists
    pub article: Option<ArticleSummary>,
    /// Diagnostic for negative replies
    pub error: Option<String>,
}

impl ArticleLookupReply {
    fn negative(request: &ArticleLookupRequest, error: String) -> Self {
        Self {
            article_id: request.article_id.clone(),
            correlation_id: request.correlation_id.clone(),
            exists: false,
            article: None,
            error: Some(error),
        }
    }

    /// Positive reply carrying the article
    pub fn found(request: &ArticleLookupRequest, article: ArticleSummary) -> Self {
        Self {
            article_id: request.article_id.clone(),
            correlation_id: request.correlation_id.clone(),
            exists: true,
            article: Some(article),
            error: None,
        }
    }

    /// Negative reply for an unknown article
    pub fn not_found(request: &ArticleLookupRequest) -> Self {
        Self::negative(request, ERROR_NOT_FOUND.to_owned())
    }

    /// Negative reply for a disabled article
    pub fn disabled(request: &ArticleLookupRequest) -> Self {
        Self::negative(request, ERROR_DISABLED.to_owned())
    }

    /// Negative reply for a catalog that could not be queried
    pub fn unavailable(request: &ArticleLookupRequest, cause: impl Display) -> Self {
        Self::negative(request, format!("{}: {}", ERROR_UNAVAILABLE_PREFIX, cause))
    }

    /// Converts the reply into the article it confirms, if any
    pub fn into_article(self) -> Option<ArticleSummary> {
        if self.exists {
            self.article
        } else {
            None
        }
    }
}

impl Response for ArticleLookupReply {
    fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}
