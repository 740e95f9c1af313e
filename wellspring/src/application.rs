//! Core application framework functionality.

use crate::config::ApplicationConfig;
use crate::runner::ApplicationRunner;
use derive_more::Constructor;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use wellspring_ioc::container::BeanContainer;
use wellspring_ioc::error::ContainerError;
use wellspring_ioc::instance::ErrorPtr;

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading application config: {0}")]
    ConfigError(ErrorPtr),
    #[error("Error refreshing the container: {0}")]
    RefreshError(ContainerError),
    #[error("Error retrieving runners: {0}")]
    RunnerInjectionError(ContainerError),
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
}

/// Main entrypoint for the application. Refreshes the container and runs
/// [ApplicationRunner]s.
#[derive(Constructor)]
pub struct Application {
    container: BeanContainer,
    config: ApplicationConfig,
}

impl Application {
    /// Creates an application with config loaded from the environment,
    /// installing the default tracing logger when configured to do so.
    pub fn build(container: BeanContainer) -> Result<Self, ApplicationError> {
        let config = ApplicationConfig::init_from_environment()
            .map_err(|error| ApplicationError::ConfigError(Arc::new(error) as ErrorPtr))?;

        if config.install_tracing_logger {
            install_tracing_logger();
        }

        Ok(Self::new(container, config))
    }

    pub fn container(&self) -> &BeanContainer {
        &self.container
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Refreshes the container, then runs all discovered runners by
    /// descending priority.
    pub fn run(&mut self) -> Result<(), ApplicationError> {
        self.container
            .refresh()
            .map_err(ApplicationError::RefreshError)?;

        info!("Searching for application runners...");

        let mut runners = self
            .container
            .beans_of_type::<dyn ApplicationRunner>()
            .map_err(ApplicationError::RunnerInjectionError)?;

        runners.sort_unstable_by_key(|runner| -runner.priority());

        info!("Running application runners...");

        for runner in &runners {
            runner
                .run(&self.container)
                .map_err(ApplicationError::RunnerError)?;
        }

        Ok(())
    }
}

fn install_tracing_logger() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}
