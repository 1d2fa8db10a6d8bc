use crate::library::communication::event::ConsumerExt;
use crate::library::communication::CommunicationFactory;
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use log::info;

/// Structure which can be instantiated with a [`CommunicationFactory`]
pub trait Service<F: CommunicationFactory + Send + Sync> {
    /// Name of the service displayed in log messages
    const NAME: &'static str;
    /// Instance type which will be instantiated
    type Instance: Send + Sync;
    /// Configuration type passed to the service
    type Config: Send + Sync;

    /// Creates a new instance which could be of a different type.
    /// This is common when `Self: RequestProcessor` where this
    /// function would return an instance of [`Responder`](crate::library::communication::request::Responder)
    /// containing an instance of `Self`.
    fn instantiate(factory: F, config: &Self::Config) -> Self::Instance;
}

/// Runner for [`Service`] implementations where [`Service::Instance`] is conforming to the [`ConsumerExt`] trait
pub struct ServiceRunner<F, S>
where
    F: CommunicationFactory + Send + Sync,
    S: Service<F>,
{
    factory: F,
    consumer: String,
    config: <S as Service<F>>::Config,
}

impl<F, S> ServiceRunner<F, S>
where
    F: CommunicationFactory + Send + Sync,
    S: Service<F>,
    S::Instance: ConsumerExt + Send + Sync,
{
    /// Creates a new runner job which consumes through the given factory using the provided consumer name.
    pub fn new(factory: F, consumer: String, config: <S as Service<F>>::Config) -> Self {
        Self {
            factory,
            consumer,
            config,
        }
    }
}

#[async_trait]
impl<F, S> Job for ServiceRunner<F, S>
where
    F: CommunicationFactory + Clone + Send + Sync + 'static,
    F::QueueProvider: 'static,
    S: Service<F> + Send + Sync + 'static,
    S::Instance: ConsumerExt,
    S::Config: 'static,
{
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = false;

    async fn execute(
        &self,
        manager: JobManager,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let provider = self.factory.queue_provider();
        let service = S::instantiate(self.factory.clone(), &self.config);

        manager.ready().await;
        info!("Service {} consuming as {}", S::NAME, self.consumer);

        service.consume_queue(provider, &self.consumer).await?;

        Ok(())
    }
}
