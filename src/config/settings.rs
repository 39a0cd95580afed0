//! Configuration settings structures for fusion-jobs
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::jobs::ExecutionMode;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "fusion-jobs".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/app.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_shutdown_timeout_ms() -> u64 {
    30_000
}

fn default_key_prefix() -> String {
    "fusion".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level)
            .map_err(|e| ConfigError::setting("logger", e.to_string()))
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self.parse_format()?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format)
            .map_err(|e| ConfigError::setting("logger.file", e.to_string()))
    }

    fn parse_format(&self) -> Result<LogFormat, ConfigError> {
        self.format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::setting("logger.file.format", e.to_string()))
    }
}

// ============================================================================
// Jobs Configuration
// ============================================================================

/// Per-job override from a `[[jobs.items]]` entry
///
/// Every field except `id` is optional; absent fields keep the value the
/// job was registered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobOverride {
    /// Id of the registered job to override
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Replace the schedule with this cron expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// Replace the schedule with a fixed delay of this many milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_rate_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_ttl_ms: Option<u64>,
}

/// Job scheduling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsSettings {
    /// Global switch; when false scheduled ticks do nothing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long shutdown waits for running jobs, in milliseconds
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Per-job overrides
    #[serde(default)]
    pub items: Vec<JobOverride>,
}

impl Default for JobsSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            items: Vec::new(),
        }
    }
}

impl JobsSettings {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

// ============================================================================
// Lock Configuration
// ============================================================================

/// Lock backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// No lock manager; only ALL_NODES jobs can run
    #[default]
    None,
    Memory,
    Redis,
}

/// Redis lock backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisLockConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,
}

impl Default for RedisLockConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
        }
    }
}

/// Distributed lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    #[serde(default)]
    pub backend: LockBackend,

    /// Prefix for every lock key stored in a shared backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default)]
    pub redis: RedisLockConfig,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            key_prefix: default_key_prefix(),
            redis: RedisLockConfig::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Job scheduling configuration
    #[serde(default)]
    pub jobs: JobsSettings,

    /// Distributed lock configuration
    #[serde(default)]
    pub lock: LockSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // Arbitrary implementations for property-based testing
    // ========================================================================

    fn arb_logger_settings() -> impl Strategy<Value = LoggerSettings> {
        (
            prop_oneof![
                Just("trace".to_string()),
                Just("debug".to_string()),
                Just("info".to_string()),
                Just("warn".to_string()),
                Just("error".to_string()),
            ],
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            prop_oneof![
                Just("json".to_string()),
                Just("full".to_string()),
                Just("compact".to_string()),
            ],
        )
            .prop_map(|(level, console, colored, file, format)| LoggerSettings {
                level,
                console: ConsoleSettings {
                    enabled: console,
                    colored,
                },
                file: FileSettings {
                    enabled: file,
                    format,
                    ..FileSettings::default()
                },
            })
    }

    fn arb_job_override() -> impl Strategy<Value = JobOverride> {
        (
            "[a-z][a-z0-9-]{0,12}",
            proptest::option::of(any::<bool>()),
            proptest::option::of(prop_oneof![
                Just("*/5 * * * *".to_string()),
                Just("0 3 * * 1-5".to_string()),
            ]),
            proptest::option::of(1u64..=86_400_000u64),
            proptest::option::of(0u64..=60_000u64),
            proptest::option::of(prop_oneof![
                Just(ExecutionMode::AllNodes),
                Just(ExecutionMode::SingleNode),
            ]),
            proptest::option::of(1u64..=3_600_000u64),
        )
            .prop_map(
                |(id, enabled, cron, fixed_rate_ms, initial_delay_ms, mode, lock_ttl_ms)| {
                    JobOverride {
                        id,
                        enabled,
                        cron,
                        fixed_rate_ms,
                        initial_delay_ms,
                        mode,
                        lock_ttl_ms,
                    }
                },
            )
    }

    fn arb_jobs_settings() -> impl Strategy<Value = JobsSettings> {
        (
            any::<bool>(),
            1u64..=600_000u64,
            prop::collection::vec(arb_job_override(), 0..4),
        )
            .prop_map(|(enabled, shutdown_timeout_ms, items)| JobsSettings {
                enabled,
                shutdown_timeout_ms,
                items,
            })
    }

    fn arb_lock_settings() -> impl Strategy<Value = LockSettings> {
        (
            prop_oneof![
                Just(LockBackend::None),
                Just(LockBackend::Memory),
                Just(LockBackend::Redis),
            ],
            "[a-z]{1,10}",
            1u32..=32u32,
        )
            .prop_map(|(backend, key_prefix, pool_size)| LockSettings {
                backend,
                key_prefix,
                redis: RedisLockConfig {
                    pool_size,
                    ..RedisLockConfig::default()
                },
            })
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (arb_logger_settings(), arb_jobs_settings(), arb_lock_settings()).prop_map(
            |(logger, jobs, lock)| Settings {
                application: ApplicationConfig::default(),
                logger,
                jobs,
                lock,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing any settings to TOML and reading them back is lossless.
        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings)
                .expect("Settings should serialize to TOML");

            let deserialized: Settings = toml::from_str(&toml_str)
                .expect("TOML should deserialize back to Settings");

            prop_assert_eq!(settings, deserialized);
        }
    }

    // ========================================================================
    // Unit tests
    // ========================================================================

    #[test]
    fn test_application_config_defaults() {
        let config = ApplicationConfig::default();
        assert_eq!(config.name, "fusion-jobs");
        assert_eq!(config.version, crate::pkg_version());
    }

    #[test]
    fn test_jobs_settings_defaults() {
        let jobs = JobsSettings::default();
        assert!(jobs.enabled);
        assert_eq!(jobs.shutdown_timeout(), Duration::from_secs(30));
        assert!(jobs.items.is_empty());
    }

    #[test]
    fn test_lock_settings_defaults() {
        let lock = LockSettings::default();
        assert_eq!(lock.backend, LockBackend::None);
        assert_eq!(lock.key_prefix, "fusion");
        assert_eq!(lock.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(lock.redis.pool_size, 4);
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: Settings = toml::from_str(
            r#"
            [jobs]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(!settings.jobs.enabled);
        assert_eq!(settings.jobs.shutdown_timeout_ms, 30_000);
        assert_eq!(settings.logger, LoggerSettings::default());
        assert_eq!(settings.lock, LockSettings::default());
    }

    #[test]
    fn test_settings_deserialize_full() {
        let settings: Settings = toml::from_str(
            r#"
            [application]
            name = "worker"
            version = "1.2.3"

            [logger]
            level = "debug"

            [logger.console]
            enabled = true
            colored = false

            [logger.file]
            enabled = true
            path = "/var/log/worker.log"
            append = false
            format = "compact"

            [jobs]
            enabled = true
            shutdown_timeout_ms = 5000

            [[jobs.items]]
            id = "heartbeat"
            fixed_rate_ms = 15000

            [[jobs.items]]
            id = "log-cleanup"
            cron = "30 4 * * *"
            mode = "SINGLE_NODE"
            lock_ttl_ms = 600000

            [lock]
            backend = "redis"
            key_prefix = "worker"

            [lock.redis]
            url = "redis://cache:6379/2"
            pool_size = 8
            connection_timeout = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.application.name, "worker");
        assert_eq!(settings.logger.file.format, "compact");
        assert!(!settings.logger.file.append);
        assert_eq!(settings.jobs.shutdown_timeout_ms, 5000);
        assert_eq!(settings.jobs.items.len(), 2);
        assert_eq!(settings.jobs.items[0].fixed_rate_ms, Some(15000));
        assert_eq!(settings.jobs.items[1].mode, Some(ExecutionMode::SingleNode));
        assert_eq!(settings.jobs.items[1].cron.as_deref(), Some("30 4 * * *"));
        assert_eq!(settings.lock.backend, LockBackend::Redis);
        assert_eq!(settings.lock.redis.pool_size, 8);
    }

    #[test]
    fn test_logger_settings_into_logger_config() {
        let settings = LoggerSettings {
            file: FileSettings {
                enabled: true,
                format: "compact".to_string(),
                ..FileSettings::default()
            },
            ..LoggerSettings::default()
        };
        let config = settings.into_logger_config().unwrap();
        assert!(config.file.enabled);
        assert_eq!(config.file.format, LogFormat::Compact);
        assert_eq!(config.file.path, PathBuf::from("logs/app.log"));
    }

    #[test]
    fn test_logger_settings_invalid_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..FileSettings::default()
            },
            ..LoggerSettings::default()
        };
        let err = settings.into_logger_config().unwrap_err();
        assert!(err.to_string().contains("logger.file.format"));
    }

    #[test]
    fn test_logger_settings_both_outputs_disabled() {
        let settings = LoggerSettings {
            console: ConsoleSettings {
                enabled: false,
                colored: false,
            },
            ..LoggerSettings::default()
        };
        assert!(settings.into_logger_config().is_err());
    }
}
