//! Answers article lookups arriving over the broker by querying the catalog API

mod options;
mod service;

use crate::harness::{Heart, Module, RedisCommunicationFactory, ServiceRunner};
use crate::library::BoxedError;
use crate::module::catalog::HttpArticleSource;
use async_trait::async_trait;
use jatsl::{schedule, JobScheduler};
use log::debug;

pub use options::Options;
pub use service::ArticleLookupService;

/// Module implementation
pub struct CatalogResponder {
    options: Options,
}

impl CatalogResponder {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for CatalogResponder {
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let factory = RedisCommunicationFactory::new(&self.options.redis.url)?;
        let source = HttpArticleSource::new(
            &self.options.catalog_url,
            self.options.upstream_timeout,
        );

        let lookup_responder = ServiceRunner::<_, ArticleLookupService<HttpArticleSource>>::new(
            factory,
            self.options.queueing.id.clone(),
            source,
        );

        debug!("Scheduling jobs");
        schedule!(scheduler, { lookup_responder });

        Ok(Some(Heart::without_heart_stone()))
    }
}
