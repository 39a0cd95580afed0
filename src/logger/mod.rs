//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output with color control
//! - File output with multiple formats (Full, Compact, JSON)
//! - Changing the level filter at runtime through [`LogLevelHandle`]

pub mod config;
pub mod error;
pub(crate) mod writer;


pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;
use std::sync::Arc;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};
use writer::LogFileWriter;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Changes the active log filter after initialization.
#[derive(Clone)]
pub struct LogLevelHandle {
    pub(crate) inner: Arc<FilterHandle>,
}

impl LogLevelHandle {
    /// Replace the filter. Accepts a plain level or any `EnvFilter`
    /// directive string.
    pub fn set_level(&self, level: &str) -> Result<(), LoggerError> {
        let filter = EnvFilter::try_new(level).map_err(|e| LoggerError::Reload {
            message: format!("invalid filter '{level}': {e}"),
        })?;
        self.inner.reload(filter).map_err(|e| LoggerError::Reload {
            message: e.to_string(),
        })
    }

    /// The active filter rendered as a directive string.
    pub fn current_level(&self) -> Option<String> {
        self.inner.with_current(|filter| filter.to_string()).ok()
    }
}

impl std::fmt::Debug for LogLevelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLevelHandle")
            .field("level", &self.current_level())
            .finish()
    }
}

/// Initialize the global logger with the given configuration
pub fn init_logger(config: LoggerConfig) -> Result<LogLevelHandle, LoggerError> {
    config.validate()?;

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    // The file layer goes before the console layer so ANSI codes from the
    // console formatter never leak into span fields written to the file.
    // See: https://github.com/tokio-rs/tracing/issues/1817
    let file_layer = if config.file.enabled {
        let writer = LogFileWriter::new(&config.file)?;
        let layer = match config.file.format {
            LogFormat::Full => fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .compact()
                .with_writer(writer)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_ansi(false)
                .json()
                .with_writer(writer)
                .boxed(),
        };
        Some(layer)
    } else {
        None
    };

    let console_layer = config.console.enabled.then(|| {
        let use_ansi = config.console.colored && std::io::stdout().is_terminal();
        fmt::layer()
            .with_ansi(use_ansi)
            .with_target(true)
            .with_level(true)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggerError::Init {
            message: e.to_string(),
        })?;

    Ok(LogLevelHandle {
        inner: Arc::new(reload_handle),
    })
}
