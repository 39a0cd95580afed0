//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

use crate::config::settings::JobOverride;

/// Errors raised while loading or validating the scheduler configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required layer such as `default.toml` is missing
    #[error("Configuration file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The merged sources do not deserialize into the settings tree
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A top-level setting is out of range
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    /// One `[[jobs.items]]` entry is invalid; nothing from the list is applied
    #[error("Invalid override jobs.items[{index}].{field} for job '{job_id}': {message}")]
    InvalidOverride {
        index: usize,
        job_id: String,
        field: &'static str,
        message: String,
    },

    /// `FUSION_APP_ENV` or `--env` names no known environment
    #[error(
        "Unknown environment '{0}'. Valid values are: development, test, staging, production"
    )]
    UnknownEnvironment(String),

    /// `FUSION_CONFIG_DIR` and `FUSION_CONFIG_FILE` are both set
    #[error(
        "FUSION_CONFIG_DIR and FUSION_CONFIG_FILE cannot both be set. Use FUSION_CONFIG_DIR \
         for layered configuration or FUSION_CONFIG_FILE for a single file."
    )]
    ConflictingSources,

    /// Error reported by the `config` crate while merging sources
    #[error("Configuration error: {0}")]
    Source(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Reject field `field` of the override at `index`.
    pub fn job_override(
        index: usize,
        item: &JobOverride,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidOverride {
            index,
            job_id: item.id.clone(),
            field,
            message: message.into(),
        }
    }

    /// Dotted path of the offending key, e.g. `jobs.items[2].cron`.
    pub fn key(&self) -> Option<String> {
        match self {
            ConfigError::InvalidSetting { key, .. } => Some(key.clone()),
            ConfigError::InvalidOverride { index, field, .. } => {
                Some(format!("jobs.items[{index}].{field}"))
            }
            _ => None,
        }
    }
}
