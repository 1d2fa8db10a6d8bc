use super::{DeathReason, Heart};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use jatsl::JobScheduler;
use log::{debug, error, info};
use std::any::type_name;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Executable module
#[async_trait]
pub trait Module {
    /// Executed before running the core loop
    async fn pre_startup(&mut self) -> EmptyResult {
        Ok(())
    }

    /// Core run loop of the module
    ///
    /// When the function returns `Some(_)` the death of the returned [`Heart`] is awaited before calling the shutdown hook.
    /// Useful for situations where you dispatch background jobs in the run loop but want to hand-off the program lifecycle management.
    ///
    /// Returning `None` results in the program entering a shutdown state and calling the `pre_shutdown` hook.
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError>;

    /// Opportunity for modules to do something before all jobs will be terminated
    async fn pre_shutdown(&mut self, _scheduler: &JobScheduler) {}

    /// Shutdown hook executed after the core loop and all associated jobs have terminated
    async fn post_shutdown(&mut self, termination_reason: ModuleTerminationReason) {
        match termination_reason {
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally => {
                info!("Module exited normally")
            }
            reason => error!("Module terminated with an error: {}", reason),
        }
    }
}

/// Reason why a module has terminated
#[derive(Error, Debug)]
pub enum ModuleTerminationReason {
    /// Startup routine threw an error
    #[error("startup routine threw an error")]
    StartupFailed(#[source] BoxedError),
    /// Core run loop threw an error
    #[error("error during operation")]
    OperationalError(#[source] BoxedError),
    /// [`Heart`] provided by module died
    #[error("heart provided by module died: {0}")]
    HeartDied(DeathReason),
    /// Run loop exited cleanly
    #[error("run loop exited cleanly")]
    ExitedNormally,
    /// Timeout during startup or shutdown
    #[error("timeout during startup or shutdown")]
    Timeout,
}

impl ModuleTerminationReason {
    /// Whether the module ended without an error
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally
        )
    }
}

/// Runner for [`Module`] implementations
pub struct ModuleRunner {
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    job_termination_timeout: Duration,
}

impl Default for ModuleRunner {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(60),
            job_termination_timeout: Duration::from_secs(5),
        }
    }
}

impl ModuleRunner {
    /// Executes a [`Module`] until it exits by calling the corresponding lifecycle functions in order
    /// and returns whether it terminated successfully.
    pub async fn run<M: Module + Send + Sync>(&self, mut module: M) -> bool {
        let scheduler = JobScheduler::default();
        let module_name = type_name::<M>();

        info!("Commencing startup sequence of {}", module_name);
        let startup = timeout(self.startup_timeout, module.pre_startup()).await;

        let termination_reason = match startup {
            Ok(Ok(_)) => self.run_loop(&mut module, &scheduler).await,
            Ok(Err(e)) => {
                error!("Module startup sequence encountered an error: {}", e);
                ModuleTerminationReason::StartupFailed(e)
            }
            Err(_) => {
                error!("Module startup sequence timed out");
                ModuleTerminationReason::Timeout
            }
        };

        let success = termination_reason.is_success();

        debug!("Running pre-shutdown hook");
        module.pre_shutdown(&scheduler).await;

        info!("Terminating remaining jobs");
        scheduler
            .terminate_jobs(self.job_termination_timeout)
            .await;

        info!("Commencing shutdown sequence of {}", module_name);
        let result = timeout(
            self.shutdown_timeout,
            module.post_shutdown(termination_reason),
        )
        .await;

        if result.is_err() {
            error!("Module shutdown sequence timed out");
            return false;
        }

        success
    }

    async fn run_loop<M: Module + Send + Sync>(
        &self,
        module: &mut M,
        scheduler: &JobScheduler,
    ) -> ModuleTerminationReason {
        info!("Executing module run procedure");
        match module.run(scheduler).await {
            Ok(None) => {
                debug!("Module run procedure completed successfully");
                ModuleTerminationReason::ExitedNormally
            }
            Ok(Some(mut heart)) => {
                debug!("Module run procedure completed successfully, entering run loop");
                let death_reason = heart.death().await;
                info!("Heart provided by run procedure died: {}", death_reason);
                ModuleTerminationReason::HeartDied(death_reason)
            }
            Err(e) => {
                error!("Module run procedure encountered an error: {}", e);
                ModuleTerminationReason::OperationalError(e)
            }
        }
    }
}
