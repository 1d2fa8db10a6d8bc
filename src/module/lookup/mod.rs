//! Asks a running responder whether an article exists and prints the outcome
//!
//! Writes the article as JSON to stdout, or `null` if it could not be confirmed.

mod options;

use crate::harness::{Heart, Module, RedisCommunicationFactory};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use crate::module::catalog::MessagingArticleCatalog;
use async_trait::async_trait;
use jatsl::JobScheduler;
use log::info;

pub use options::Options;

/// Module implementation
pub struct ArticleLookup {
    options: Options,
}

impl ArticleLookup {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for ArticleLookup {
    async fn run(&mut self, _scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let factory = RedisCommunicationFactory::new(&self.options.redis.url)?;
        let catalog = MessagingArticleCatalog::new(factory.requestor(), self.options.lookup.timeout);

        let article = catalog
            .lookup(&self.options.article_id, self.options.token.as_deref())
            .await;

        info!(
            "Article {} exists: {}",
            self.options.article_id,
            article.is_some()
        );
        println!("{}", serde_json::to_string_pretty(&article)?);

        Ok(None)
    }
}
