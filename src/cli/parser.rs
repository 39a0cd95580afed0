//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use jiff::Timestamp;

/// A distributed-aware job scheduler
#[derive(Parser, Debug)]
#[command(name = "fusion-jobs")]
#[command(about = "A distributed-aware job scheduler")]
#[command(long_about = "
Fusion-jobs runs recurring jobs on cron or fixed-delay schedules. Jobs in
SINGLE_NODE mode take a cluster lock before each run so only one process
executes a given tick.

EXAMPLES:
    # Run the scheduler with default configuration
    fusion-jobs run

    # Use custom configuration file
    fusion-jobs --config /path/to/config.toml run

    # Check configuration and print the job table without starting
    fusion-jobs run --dry-run

    # Show the effective jobs after configuration overrides
    fusion-jobs list

    # Preview the next 5 fire times of a cron expression
    fusion-jobs next '*/15 9-17 * * 1-5' --count 5

For more information about configuration options, see the documentation.
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load exactly this TOML file instead of the layered configuration
    /// directory. Environment variables still override its values.
    ///
    /// Example: --config /etc/fusion-jobs/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` layer is loaded.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Increases log output to debug level.
    /// Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only.
    /// Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler until a shutdown signal (default)
    ///
    /// Binds the configured lock backend, registers the built-in jobs,
    /// applies configuration overrides and starts every enabled job.
    /// SIGINT or SIGTERM stops the scheduler within the configured
    /// shutdown timeout.
    ///
    /// Examples:
    ///   fusion-jobs run              # Start with defaults
    ///   fusion-jobs run --dry-run    # Validate config without starting
    Run {
        /// Log level override
        ///
        /// This overrides both configuration file settings and global
        /// --verbose/--quiet flags.
        ///
        /// Available levels: error, warn, info, debug, trace
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration, print the job table and exit
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective job definitions and their next fire time
    List,

    /// Print upcoming fire times of a cron expression
    ///
    /// Expressions have five fields (minute hour day-of-month month
    /// day-of-week) and are evaluated in UTC.
    ///
    /// Examples:
    ///   fusion-jobs next '0 3 * * *'
    ///   fusion-jobs next '0 0 29 2 *' --count 3 --after 2025-01-01T00:00:00Z
    Next {
        /// Cron expression, quoted
        #[arg(value_name = "EXPR")]
        expression: String,

        /// How many fire times to print (1-1000)
        #[arg(short = 'n', long, default_value_t = 5, value_parser = super::validation::validate_count)]
        count: usize,

        /// Start searching strictly after this RFC 3339 instant (default: now)
        #[arg(long, value_name = "TIMESTAMP", value_parser = super::validation::validate_timestamp)]
        after: Option<Timestamp>,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl Cli {
    /// The log level requested on the command line, if any.
    ///
    /// `run --log-level` wins over `--verbose` and `--quiet`.
    pub fn log_level_override(&self) -> Option<String> {
        if let Some(Commands::Run {
            log_level: Some(level),
            ..
        }) = &self.command
        {
            return Some(String::from(*level));
        }

        if self.verbose {
            Some(String::from(LogLevel::Debug))
        } else if self.quiet {
            Some(String::from(LogLevel::Error))
        } else {
            None
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error".to_string(),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Debug => "debug".to_string(),
            LogLevel::Trace => "trace".to_string(),
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["fusion-jobs", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["fusion-jobs", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["fusion-jobs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
        assert!(cli.log_level_override().is_none());
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["fusion-jobs", "run", "--dry-run", "--log-level", "warn"])
            .unwrap();
        match cli.command {
            Some(Commands::Run { log_level, dry_run }) => {
                assert!(dry_run);
                assert!(matches!(log_level, Some(LogLevel::Warn)));
            }
            other => panic!("Expected Run command, got {other:?}"),
        }
    }

    #[test]
    fn test_next_command_defaults() {
        let cli = Cli::try_parse_from(["fusion-jobs", "next", "0 3 * * *"]).unwrap();
        match cli.command {
            Some(Commands::Next {
                expression,
                count,
                after,
            }) => {
                assert_eq!(expression, "0 3 * * *");
                assert_eq!(count, 5);
                assert!(after.is_none());
            }
            other => panic!("Expected Next command, got {other:?}"),
        }
    }

    #[test]
    fn test_next_command_with_options() {
        let cli = Cli::try_parse_from([
            "fusion-jobs",
            "next",
            "*/5 * * * *",
            "--count",
            "3",
            "--after",
            "2025-01-01T00:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Next { count, after, .. }) => {
                assert_eq!(count, 3);
                assert_eq!(after, Some("2025-01-01T00:00:00Z".parse().unwrap()));
            }
            other => panic!("Expected Next command, got {other:?}"),
        }
    }

    #[test]
    fn test_next_command_rejects_zero_count() {
        let result = Cli::try_parse_from(["fusion-jobs", "next", "* * * * *", "--count", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["fusion-jobs", "--env", "stage", "list"]).unwrap();
        assert!(matches!(cli.env, Some(Environment::Staging)));
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_log_level_precedence() {
        let cli = Cli::try_parse_from(["fusion-jobs", "--verbose"]).unwrap();
        assert_eq!(cli.log_level_override().as_deref(), Some("debug"));

        let cli = Cli::try_parse_from(["fusion-jobs", "--quiet", "run"]).unwrap();
        assert_eq!(cli.log_level_override().as_deref(), Some("error"));

        let cli =
            Cli::try_parse_from(["fusion-jobs", "--verbose", "run", "--log-level", "trace"]).unwrap();
        assert_eq!(cli.log_level_override().as_deref(), Some("trace"));
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["fusion-jobs", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
