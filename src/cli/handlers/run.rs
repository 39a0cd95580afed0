//! Run command handler
//!
//! Handles the run command including dry-run validation and scheduler startup.

use jiff::Timestamp;

use super::list::render_job_table;
use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::runtime::Runtime;

/// Handler for the run command
pub struct RunCommandHandler {
    runtime: Runtime,
}

impl RunCommandHandler {
    /// Create a new run command handler
    pub fn new(config: Settings) -> Self {
        Self {
            runtime: Runtime::new(config),
        }
    }

    /// Execute the run command with optional dry-run support
    ///
    /// # Arguments
    /// * `dry_run` - If true, validates configuration and exits without starting the scheduler
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Lock backend or job registration errors (if not dry-run)
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            self.validate_only()
        } else {
            self.runtime.run().await
        }
    }

    /// Validate configuration and print the job table without starting
    pub fn validate_only(&self) -> AppResult<()> {
        let settings = self.runtime.settings();
        settings.validate()?;
        let registry = self.runtime.registry()?;

        println!("✓ Configuration is valid");
        println!("✓ Lock backend: {:?}", settings.lock.backend);
        println!(
            "✓ Scheduling globally {}",
            if settings.jobs.enabled { "enabled" } else { "disabled" }
        );
        println!("✓ {} job(s) registered", registry.len());
        println!();
        print!("{}", render_job_table(registry.definitions(), Timestamp::now()));
        println!();
        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        self.runtime.settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobOverride;
    use crate::error::AppError;

    #[test]
    fn test_run_handler_new() {
        let config = Settings::default();
        let handler = RunCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_run_handler_dry_run() {
        let handler = RunCommandHandler::new(Settings::default());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_handler_dry_run_invalid_config() {
        let mut config = Settings::default();
        config.jobs.shutdown_timeout_ms = 0;
        let handler = RunCommandHandler::new(config);

        let result = handler.execute(true).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_handler_dry_run_unknown_override_is_ignored() {
        let mut config = Settings::default();
        config.jobs.items = vec![JobOverride {
            id: "no-such-job".to_string(),
            enabled: Some(false),
            ..Default::default()
        }];
        let handler = RunCommandHandler::new(config);

        assert!(handler.execute(true).await.is_ok());
    }
}
