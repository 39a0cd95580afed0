//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing.

use super::handlers::{ListCommandHandler, NextCommandHandler, RunCommandHandler};
use super::parser::{Cli, Commands};
use super::{init_logger_from_settings, load_settings};
use crate::error::AppResult;

/// Execute a CLI command
///
/// `next` works without any configuration; the other commands load the
/// layered configuration first. Only `run` without `--dry-run` installs the
/// global logger.
///
/// # Errors
/// Returns errors from configuration loading or the command handlers
pub async fn execute_command(cli: &Cli) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Next {
            expression,
            count,
            after,
        }) => NextCommandHandler::new(expression.as_str(), *count, *after).execute(),
        Some(Commands::List) => ListCommandHandler::new(load_settings(cli)?).execute(),
        Some(Commands::Run { dry_run, .. }) => run(cli, *dry_run).await,
        None => run(cli, false).await,
    }
}

async fn run(cli: &Cli, dry_run: bool) -> AppResult<()> {
    let settings = load_settings(cli)?;
    if !dry_run {
        init_logger_from_settings(&settings, cli.log_level_override())?;
    }
    RunCommandHandler::new(settings).execute(dry_run).await
}
