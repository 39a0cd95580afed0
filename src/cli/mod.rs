//! CLI module for fusion-jobs
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration loading with CLI overrides
//! - Command handlers for run, list and next

pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

// Re-export public types for convenience
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use crate::config::{ConfigError, ConfigLoader, Settings};
use crate::error::AppResult;
use crate::logger::{LogLevelHandle, init_logger};

/// Load configuration, honouring `--config` and `--env`
///
/// # Errors
/// Returns error if configuration loading or validation fails
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut loader = ConfigLoader::new()?;
    if let Some(path) = &cli.config {
        loader = loader.with_config_file(path);
    }
    if let Some(env) = cli.env {
        loader = loader.with_environment(env.into());
    }
    loader.load()
}

/// Initialize the global logger from settings
///
/// `level` replaces the configured level when present (from `--verbose`,
/// `--quiet` or `run --log-level`).
///
/// # Errors
/// Returns error if the logger configuration is invalid or a global
/// subscriber is already installed
pub fn init_logger_from_settings(
    settings: &Settings,
    level: Option<String>,
) -> AppResult<LogLevelHandle> {
    let mut logger = settings.logger.clone();
    if let Some(level) = level {
        logger.level = level;
    }
    let config = logger.into_logger_config()?;
    Ok(init_logger(config)?)
}
