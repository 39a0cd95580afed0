//! Jobs shipped with the binary.

mod heartbeat;
mod log_cleanup;

pub use heartbeat::HeartbeatTask;
pub use log_cleanup::{LogCleanupTask, LogFiles};

use std::sync::Arc;
use std::time::Duration;

use crate::jobs::definition::JobDefinition;
use crate::jobs::error::JobError;
use crate::jobs::registry::JobRegistry;
use crate::jobs::schedule::Schedule;
use crate::jobs::types::ExecutionMode;

pub const HEARTBEAT_JOB: &str = "heartbeat";
pub const LOG_CLEANUP_JOB: &str = "log-cleanup";

/// Register the built-in jobs.
///
/// `log-cleanup` reads its target directory from a [`LogFiles`] resource
/// when it runs, so the host must provide one.
pub fn register_builtin(registry: &mut JobRegistry) -> Result<(), JobError> {
    registry
        .register(
            JobDefinition::from_task(
                HEARTBEAT_JOB,
                Schedule::fixed_rate(Duration::from_secs(60)),
                HeartbeatTask,
            )
            .with_mode(ExecutionMode::AllNodes),
        )?
        .register(
            JobDefinition::new(LOG_CLEANUP_JOB, Schedule::cron("0 3 * * *")?, |resources| {
                let files = resources.require::<LogFiles>()?;
                Ok(Arc::new(LogCleanupTask::new(
                    files.as_ref().clone(),
                    LogCleanupTask::DEFAULT_RETENTION,
                )))
            })
            .with_mode(ExecutionMode::SingleNode)
            .with_lock_ttl(Duration::from_secs(10 * 60)),
        )?;
    Ok(())
}
