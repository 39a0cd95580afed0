use thiserror::Error;

use crate::jobs::cron::CronError;

/// Errors surfaced synchronously by the scheduler API.
///
/// Failures inside a job body never appear here; they are recorded in the
/// job's status and reported to the listener instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidCronExpression(#[from] CronError),

    #[error("Invalid schedule for job '{job_id}': {reason}")]
    InvalidSchedule { job_id: String, reason: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error(
        "Job '{0}' runs in SINGLE_NODE mode but no lock manager is bound; \
         configure a lock backend or switch the job to ALL_NODES"
    )]
    LockManagerMissing(String),

    #[error("Scheduler already started")]
    AlreadyStarted,

    #[error("Scheduler has been shut down")]
    ShutDown,
}
