use thiserror::Error;

use crate::config::ConfigError;
use crate::jobs::JobError;
use crate::lock::LockError;
use crate::logger::LoggerError;

/// Error type of the command surface.
///
/// Library modules keep their own error enums; this one gathers them so
/// command handlers can use `?` across module boundaries and `main` can
/// report a single error with its source chain.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logger could not be initialized
    #[error("Logger error: {0}")]
    Logger(#[from] LoggerError),

    /// Job registration or scheduling error
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Lock backend could not be reached or configured
    #[error("Lock backend error: {0}")]
    Lock(#[from] LockError),

    /// Validation error for command line input
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
