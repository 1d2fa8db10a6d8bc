use crate::domain::request::ArticleLookupRequest;
use crate::domain::{ArticleCatalog, ArticleSummary};
use crate::library::communication::request::{Request, RequestError, Requestor};
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

/// Default time to wait for a lookup reply
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// [`ArticleCatalog`] asking a responder over the broker
///
/// Every lookup uses its own reply channel and correlation id. Timeouts, transport failures
/// and malformed replies are logged and reported as a missing article.
pub struct MessagingArticleCatalog<R> {
    requestor: R,
    timeout: Duration,
}

impl<R> MessagingArticleCatalog<R>
where
    R: Requestor + Send + Sync,
{
    /// Creates a new instance waiting at most `timeout` for each reply
    pub fn new(requestor: R, timeout: Duration) -> Self {
        Self { requestor, timeout }
    }

    /// Requestor used to send lookups
    pub fn requestor(&self) -> &R {
        &self.requestor
    }

    /// Looks up an article, resolving to `None` unless it is confirmed to exist and be enabled
    pub async fn lookup(&self, article_id: &str, auth_token: Option<&str>) -> Option<ArticleSummary> {
        if article_id.is_empty() {
            debug!("Refusing to look up empty article id");
            return None;
        }

        let request = ArticleLookupRequest::new(article_id, auth_token);

        match self.requestor.request(&request, self.timeout).await {
            Ok(reply) => {
                if let Some(error) = &reply.error {
                    debug!("Article {} not confirmed: {}", article_id, error);
                }

                reply.into_article()
            }
            Err(RequestError::Timeout(timeout)) => {
                warn!(
                    "No reply for article {} within {:?} ({})",
                    article_id,
                    timeout,
                    request.correlation_id()
                );
                None
            }
            Err(e) => {
                warn!("Lookup of article {} failed: {}", article_id, e);
                None
            }
        }
    }
}

#[async_trait]
impl<R> ArticleCatalog for MessagingArticleCatalog<R>
where
    R: Requestor + Send + Sync,
{
    async fn get(&self, article_id: &str, auth_token: Option<&str>) -> Option<ArticleSummary> {
        self.lookup(article_id, auth_token).await
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::domain::fake::FakeArticleSource;
    use crate::domain::request::ArticleLookupReply;
    use crate::library::communication::event::{ConsumerExt, Notification, NotificationPublisher};
    use crate::library::communication::implementation::memory::MemoryBroker;
    use crate::library::communication::implementation::mock::MockRequestor;
    use crate::library::communication::request::{CompositeRequestor, Responder, ResponsePublisher};
    use crate::library::communication::CommunicationFactory;
    use crate::module::responder::ArticleLookupService;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, Instant};

    type MemoryCatalog = MessagingArticleCatalog<CompositeRequestor<MemoryBroker, MemoryBroker>>;

    const SHORT_TIMEOUT: Duration = Duration::from_millis(200);

    fn source() -> FakeArticleSource {
        FakeArticleSource::default()
            .with_article(ArticleSummary::new("X", "Widget"))
            .with_article(ArticleSummary::new("D", "Dusty").with_enabled(false))
            .failing_on("Y")
    }

    fn catalog(broker: &MemoryBroker, timeout: Duration) -> MemoryCatalog {
        MessagingArticleCatalog::new(broker.requestor(), timeout)
    }

    async fn spawn_responder(broker: &MemoryBroker, source: FakeArticleSource) -> JoinHandle<()> {
        declare(broker).await;

        let responder = Responder::new(ArticleLookupService::new(source), broker.clone());
        let provider = broker.clone();

        tokio::spawn(async move {
            responder.consume_queue(provider, "responder").await.ok();
        })
    }

    async fn declare(broker: &MemoryBroker) {
        use crate::library::communication::event::QueueProvider;
        broker
            .declare(&ArticleLookupRequest::queue())
            .await
            .unwrap();
    }

    fn assert_released(broker: &MemoryBroker, catalog: &MemoryCatalog) {
        assert_eq!(broker.bound_reply_channels(), 0);
        assert_eq!(catalog.requestor().in_flight(), 0);
    }

    #[tokio::test]
    async fn return_enabled_article() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        let article = catalog.get("X", None).await;

        assert_eq!(article, Some(ArticleSummary::new("X", "Widget")));
        assert!(catalog.exists("X", None).await);
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn reject_disabled_and_unknown_articles() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        assert_eq!(catalog.get("D", None).await, None);
        assert_eq!(catalog.get("unknown", None).await, None);
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn fail_closed_on_upstream_failure() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        assert!(!catalog.exists("Y", None).await);
        assert_eq!(catalog.get("Y", None).await, None);
    }

    #[tokio::test]
    async fn time_out_without_responder() {
        let broker = MemoryBroker::default();
        declare(&broker).await;
        let catalog = catalog(&broker, SHORT_TIMEOUT);

        let start = Instant::now();
        let article = catalog.get("X", None).await;

        assert_eq!(article, None);
        assert!(start.elapsed() < DEFAULT_LOOKUP_TIMEOUT);
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn fail_closed_while_broker_is_unavailable() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);
        broker.set_available(false);

        assert_eq!(catalog.get("X", None).await, None);
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn skip_empty_article_ids() {
        let requestor = MockRequestor::default();
        let catalog = MessagingArticleCatalog::new(requestor, DEFAULT_LOOKUP_TIMEOUT);

        assert_eq!(catalog.get("", None).await, None);
    }

    #[tokio::test]
    async fn forward_bare_token_to_upstream() {
        let broker = MemoryBroker::default();
        let upstream = source();
        let _responder = spawn_responder(&broker, upstream.clone()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        catalog.get("X", Some("Bearer secret")).await;
        catalog.get("X", Some("")).await;

        assert_eq!(upstream.tokens(), vec![Some("secret".to_owned()), None]);
    }

    #[tokio::test]
    async fn isolate_concurrent_lookups() {
        let broker = MemoryBroker::default();
        let mut upstream = source();

        for i in 0..20 {
            upstream = upstream.with_article(ArticleSummary::new(format!("A{}", i), format!("N{}", i)));
        }

        let _responder = spawn_responder(&broker, upstream).await;
        let catalog = Arc::new(catalog(&broker, DEFAULT_LOOKUP_TIMEOUT));

        let lookups = (0..20).map(|i| {
            let catalog = catalog.clone();
            async move { (i, catalog.get(&format!("A{}", i), None).await) }
        });

        for (i, article) in futures::future::join_all(lookups).await {
            assert_eq!(article.map(|a| a.name), Some(format!("N{}", i)));
        }

        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn drop_late_replies() {
        let broker = MemoryBroker::default();
        declare(&broker).await;
        let catalog = catalog(&broker, SHORT_TIMEOUT);
        let late_broker = broker.clone();

        // Answers each request only after the requester gave up
        let late_responder = tokio::spawn(async move {
            use crate::library::communication::event::{QueueEntry, QueueProvider, RawQueueEntry};
            use futures::StreamExt;

            let mut stream = late_broker
                .consume(ArticleLookupRequest::queue(), "late", 1, None)
                .await
                .unwrap();

            while let Some(Ok(mut entry)) = stream.next().await {
                let request: ArticleLookupRequest = entry.parse_payload().unwrap();
                sleep(SHORT_TIMEOUT * 2).await;

                let reply = ArticleLookupReply::found(&request, ArticleSummary::new("X", "Widget"));
                ResponsePublisher::publish(&late_broker, &reply, request.reply_to())
                    .await
                    .unwrap();
                entry.acknowledge().await.unwrap();
            }
        });

        assert_eq!(catalog.get("X", None).await, None);
        sleep(SHORT_TIMEOUT * 3).await;

        assert_released(&broker, &catalog);
        late_responder.abort();
    }

    #[tokio::test]
    async fn survive_malformed_requests() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        {
            use crate::library::communication::event::RawNotificationPublisher;
            broker
                .publish_raw(b"{ not json", ArticleLookupRequest::queue())
                .await
                .unwrap();
        }

        assert_eq!(
            catalog.get("X", None).await,
            Some(ArticleSummary::new("X", "Widget"))
        );

        sleep(Duration::from_millis(50)).await;
        assert_eq!(broker.queue_len(ArticleLookupRequest::queue().queue()), 0);
    }

    #[tokio::test]
    async fn release_abandoned_lookups() {
        let broker = MemoryBroker::default();
        declare(&broker).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);

        let abandoned = tokio::time::timeout(SHORT_TIMEOUT, catalog.get("X", None)).await;

        assert!(abandoned.is_err());
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn honor_only_first_of_duplicate_replies() {
        let broker = MemoryBroker::default();
        declare(&broker).await;
        let catalog = catalog(&broker, DEFAULT_LOOKUP_TIMEOUT);
        let responder_broker = broker.clone();

        let duplicating_responder = tokio::spawn(async move {
            use crate::library::communication::event::{QueueEntry, QueueProvider, RawQueueEntry};
            use futures::StreamExt;

            let mut stream = responder_broker
                .consume(ArticleLookupRequest::queue(), "duplicating", 1, None)
                .await
                .unwrap();

            if let Some(Ok(mut entry)) = stream.next().await {
                let request: ArticleLookupRequest = entry.parse_payload().unwrap();
                let first = ArticleLookupReply::found(&request, ArticleSummary::new("X", "First"));
                let second = ArticleLookupReply::found(&request, ArticleSummary::new("X", "Second"));

                for reply in [first, second] {
                    ResponsePublisher::publish(&responder_broker, &reply, request.reply_to())
                        .await
                        .unwrap();
                }

                entry.acknowledge().await.unwrap();
            }
        });

        let article = catalog.get("X", None).await;
        duplicating_responder.await.unwrap();

        assert_eq!(article.map(|a| a.name), Some("First".to_owned()));
        assert_released(&broker, &catalog);
    }

    #[tokio::test]
    async fn pass_scripted_replies_through() {
        let requestor = MockRequestor::default();
        let request = ArticleLookupRequest::new("X", Some("token"));
        requestor.expect_and_respond(
            &request,
            Some(ArticleLookupReply::found(&request, ArticleSummary::new("X", "Widget"))),
        );
        requestor.expect_and_respond(&request, None);

        let catalog = MessagingArticleCatalog::new(requestor, DEFAULT_LOOKUP_TIMEOUT);

        assert!(catalog.exists("X", Some("token")).await);
        assert!(!catalog.exists("X", Some("Bearer token")).await);
    }

    #[tokio::test]
    async fn deliver_through_published_notifications() {
        let broker = MemoryBroker::default();
        let _responder = spawn_responder(&broker, source()).await;

        let request = ArticleLookupRequest::new("X", None);
        let mut channel = {
            use crate::library::communication::request::ReplyChannelProvider;
            broker.open(request.reply_to()).await.unwrap()
        };

        NotificationPublisher::publish(&broker, &request).await.unwrap();

        let reply: ArticleLookupReply = {
            use crate::library::communication::request::ReplyChannel;
            channel.receive().await.unwrap().unwrap()
        };

        assert!(reply.exists);
        assert_eq!(reply.article.map(|a| a.name), Some("Widget".to_owned()));
        assert_eq!(reply.correlation_id, request.correlation_id());
    }
}
