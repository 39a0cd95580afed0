//! Process hosting for the scheduler
//!
//! This module wires the configured lock backend, the built-in jobs and the
//! configuration overrides into a [`JobScheduler`] and runs it until a
//! shutdown signal arrives.

use std::future::Future;

use tokio::signal;

use crate::config::{Environment, Settings};
use crate::error::AppResult;
use crate::jobs::tasks::{LogFiles, register_builtin};
use crate::jobs::{JobError, JobRegistry, JobScheduler, Resources};
use crate::lock::build_lock_manager;

/// Scheduler host
pub struct Runtime {
    settings: Settings,
}

impl Runtime {
    /// Create a new runtime with the given settings
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The built-in jobs with `[[jobs.items]]` overrides applied.
    pub fn registry(&self) -> Result<JobRegistry, JobError> {
        let mut registry = JobRegistry::new();
        register_builtin(&mut registry)?;
        registry.apply_overrides(&self.settings.jobs)?;
        Ok(registry)
    }

    /// Shared dependencies available to job factories.
    pub fn resources(&self) -> Resources {
        Resources::new().with(LogFiles::from_log_path(&self.settings.logger.file.path))
    }

    /// Build a scheduler bound to the configured lock backend.
    ///
    /// # Errors
    /// - Lock backend connection errors
    /// - Invalid job overrides
    pub async fn build_scheduler(&self) -> AppResult<JobScheduler> {
        let lock_manager = build_lock_manager(&self.settings.lock).await?;
        tracing::info!(
            backend = ?self.settings.lock.backend,
            bound = lock_manager.is_some(),
            "Lock backend configured"
        );

        let scheduler = JobScheduler::builder(self.registry()?)
            .settings(&self.settings.jobs)
            .maybe_lock_manager(lock_manager)
            .resources(self.resources())
            .build();
        Ok(scheduler)
    }

    /// Run the scheduler until Ctrl+C or SIGTERM.
    pub async fn run(self) -> AppResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the scheduler until `signal` resolves, then shut it down within
    /// the configured timeout.
    ///
    /// # Errors
    /// - Lock backend initialization errors
    /// - Job registration errors
    pub async fn run_until<F>(self, signal: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env(),
            "Application starting"
        );

        tracing::info!(
            level = %self.settings.logger.level,
            console_enabled = %self.settings.logger.console.enabled,
            file_enabled = %self.settings.logger.file.enabled,
            "Logger configuration loaded"
        );

        let scheduler = self.build_scheduler().await?;
        scheduler.start()?;
        tracing::info!(
            jobs = scheduler.job_ids().count(),
            global_enabled = self.settings.jobs.enabled,
            "Scheduler running"
        );

        signal.await;

        let completed = scheduler.shutdown(None).await;
        if completed {
            tracing::info!("Scheduler shutdown complete");
        } else {
            tracing::warn!(
                timeout_ms = self.settings.jobs.shutdown_timeout_ms,
                "Scheduler shutdown timed out; some jobs were still running"
            );
        }

        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
///
/// This function returns when either signal is received, allowing
/// the scheduler to perform graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
