use crate::domain::request::{ArticleLookupReply, ArticleLookupRequest};
use crate::domain::ArticleSource;
use crate::harness::Service;
use crate::library::communication::request::{Request, RequestProcessor, Responder};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use async_trait::async_trait;
use log::{debug, warn};

/// Answers article lookups from an [`ArticleSource`]
///
/// Failures of the source are reported in the reply so the requester does not have to wait
/// for its deadline.
pub struct ArticleLookupService<S> {
    source: S,
}

impl<S> ArticleLookupService<S> {
    /// Creates a new instance from raw parts
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<F, S> Service<F> for ArticleLookupService<S>
where
    F: CommunicationFactory + Send + Sync,
    S: ArticleSource + Clone + Send + Sync,
{
    const NAME: &'static str = "ArticleLookupService";

    type Instance = Responder<ArticleLookupRequest, Self, F::ResponsePublisher>;
    type Config = S;

    fn instantiate(factory: F, source: &Self::Config) -> Self::Instance {
        Responder::new(Self::new(source.clone()), factory.response_publisher())
    }
}

#[async_trait]
impl<S> RequestProcessor for ArticleLookupService<S>
where
    S: ArticleSource + Send + Sync,
{
    type Request = ArticleLookupRequest;

    async fn process(&self, request: Self::Request) -> Result<ArticleLookupReply, BoxedError> {
        let lookup = self
            .source
            .fetch_article(&request.article_id, request.auth_token.as_deref())
            .await;

        let reply = match lookup {
            Ok(Some(article)) if article.enabled => ArticleLookupReply::found(&request, article),
            Ok(Some(_)) => ArticleLookupReply::disabled(&request),
            Ok(None) => ArticleLookupReply::not_found(&request),
            Err(e) => {
                warn!("Unable to look up article {}: {}", request.article_id, e);
                ArticleLookupReply::unavailable(&request, e)
            }
        };

        debug!(
            "Article {} exists: {} ({})",
            request.article_id,
            reply.exists,
            request.correlation_id()
        );

        Ok(reply)
    }
}
