//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use std::collections::HashSet;

use crate::config::error::ConfigError;
use crate::config::settings::{
    FileSettings, JobOverride, JobsSettings, LockBackend, LockSettings, LoggerSettings, Settings,
};
use crate::jobs::cron::CronExpression;

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::setting(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::setting(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - At least one of console or file output must be enabled
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::setting(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::setting(
                "logger",
                "At least one of console or file output must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl JobOverride {
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let reject = |field: &'static str, message: String| {
            ConfigError::job_override(index, self, field, message)
        };

        if self.id.trim().is_empty() {
            return Err(reject("id", "Job id must not be empty.".to_string()));
        }

        if self.cron.is_some() && self.fixed_rate_ms.is_some() {
            return Err(reject(
                "cron",
                "Both cron and fixed_rate_ms are set; pick one schedule.".to_string(),
            ));
        }

        if let Some(expression) = &self.cron {
            CronExpression::parse(expression).map_err(|e| reject("cron", e.to_string()))?;
        }

        if self.fixed_rate_ms == Some(0) {
            return Err(reject(
                "fixed_rate_ms",
                "Fixed rate must be greater than 0 milliseconds.".to_string(),
            ));
        }

        if self.lock_ttl_ms == Some(0) {
            return Err(reject(
                "lock_ttl_ms",
                "Lock TTL must be greater than 0 milliseconds.".to_string(),
            ));
        }

        Ok(())
    }
}

impl JobsSettings {
    /// Validate job scheduling settings
    ///
    /// # Validation Rules
    /// - Shutdown timeout must be greater than 0
    /// - Override ids must be unique
    /// - An override may set `cron` or `fixed_rate_ms`, not both
    /// - Cron expressions must parse; rates and TTLs must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::setting(
                "jobs.shutdown_timeout_ms",
                "Shutdown timeout must be greater than 0 milliseconds.",
            ));
        }

        let mut seen = HashSet::new();
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigError::job_override(
                    index,
                    item,
                    "id",
                    "The job is overridden more than once.",
                ));
            }
        }

        Ok(())
    }
}

impl LockSettings {
    /// Validate lock settings
    ///
    /// The Redis section is only checked when Redis is the selected backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend != LockBackend::Redis {
            return Ok(());
        }

        if self.redis.url.trim().is_empty() {
            return Err(ConfigError::setting(
                "lock.redis.url",
                "Redis URL is required when the redis lock backend is selected.",
            ));
        }

        if self.redis.pool_size == 0 {
            return Err(ConfigError::setting(
                "lock.redis.pool_size",
                "Redis pool size must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.jobs.validate()?;
        self.lock.validate()?;
        Ok(())
    }
}
