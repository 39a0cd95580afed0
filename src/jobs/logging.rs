//! Per-job structured logging.
//!
//! Scheduler events are reported as an event name plus a JSON field map
//! (`job.started {"job_id": "...", "fire_time": "..."}`). The default
//! factory forwards them to `tracing`; hosts may plug in their own sink.

use std::sync::Arc;

use serde_json::Value;
use tracing::Level;

/// Logger bound to one name, usually `fusion.jobs.<job id>`.
pub trait JobLogger: Send + Sync {
    fn log(&self, level: Level, event: &str, fields: Value);

    fn debug(&self, event: &str, fields: Value) {
        self.log(Level::DEBUG, event, fields);
    }

    fn info(&self, event: &str, fields: Value) {
        self.log(Level::INFO, event, fields);
    }

    fn warn(&self, event: &str, fields: Value) {
        self.log(Level::WARN, event, fields);
    }

    fn error(&self, event: &str, fields: Value) {
        self.log(Level::ERROR, event, fields);
    }
}

/// Hands out named loggers.
pub trait LoggerFactory: Send + Sync {
    fn logger(&self, name: &str) -> Arc<dyn JobLogger>;
}

/// Logger name used for a job's events.
pub fn job_logger_name(job_id: &str) -> String {
    format!("fusion.jobs.{job_id}")
}

/// Name of the scheduler-wide logger.
pub const SCHEDULER_LOGGER: &str = "fusion.jobs";

/// Factory emitting every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLoggerFactory;

impl LoggerFactory for TracingLoggerFactory {
    fn logger(&self, name: &str) -> Arc<dyn JobLogger> {
        Arc::new(TracingLogger {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: String,
}

impl JobLogger for TracingLogger {
    fn log(&self, level: Level, event: &str, fields: Value) {
        let name = self.name.as_str();
        match level {
            Level::ERROR => tracing::error!(logger = name, event, %fields, "{event}"),
            Level::WARN => tracing::warn!(logger = name, event, %fields, "{event}"),
            Level::INFO => tracing::info!(logger = name, event, %fields, "{event}"),
            Level::DEBUG => tracing::debug!(logger = name, event, %fields, "{event}"),
            _ => tracing::trace!(logger = name, event, %fields, "{event}"),
        }
    }
}
