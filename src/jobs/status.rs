//! Per-job status records.
//!
//! One record per job id, created with the scheduler and shared by `Arc`
//! between the job's loop, manual triggers and snapshot readers. Counters,
//! result and the running flag change together under a short write lock, so
//! a snapshot never sees `last_result` updated without the matching counter
//! or a running flag from another moment.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use parking_lot::RwLock;

use crate::jobs::definition::JobDefinition;
use crate::jobs::logging::JobLogger;
use crate::jobs::types::{JobResult, JobStatus};

#[derive(Debug, Clone, Default)]
struct StatusState {
    last_fire_time: Option<Timestamp>,
    last_duration: Option<Duration>,
    last_result: Option<JobResult>,
    next_fire_time: Option<Timestamp>,
    run_count: u64,
    fail_count: u64,
    running: bool,
}

pub(crate) struct JobRecord {
    pub(crate) definition: JobDefinition,
    pub(crate) logger: Arc<dyn JobLogger>,
    state: RwLock<StatusState>,
}

impl JobRecord {
    pub(crate) fn new(definition: JobDefinition, logger: Arc<dyn JobLogger>) -> Self {
        Self {
            definition,
            logger,
            state: RwLock::new(StatusState::default()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.definition.id
    }

    /// Claim the reentrancy guard. `None` while a previous tick is in flight.
    pub(crate) fn try_begin(&self) -> Option<RunningGuard<'_>> {
        let mut state = self.state.write();
        if state.running {
            return None;
        }
        state.running = true;
        Some(RunningGuard { record: self })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.read().running
    }

    pub(crate) fn set_next_fire_time(&self, next: Option<Timestamp>) {
        self.state.write().next_fire_time = next;
    }

    pub(crate) fn record_skipped(&self, fire_time: Timestamp) {
        let mut state = self.state.write();
        state.last_fire_time = Some(fire_time);
        state.last_result = Some(JobResult::Skipped);
    }

    pub(crate) fn record_success(&self, fire_time: Timestamp, duration: Duration) {
        let mut state = self.state.write();
        state.last_fire_time = Some(fire_time);
        state.last_duration = Some(duration);
        state.last_result = Some(JobResult::Success);
        state.run_count += 1;
    }

    pub(crate) fn record_failure(&self, fire_time: Timestamp, duration: Duration) {
        let mut state = self.state.write();
        state.last_fire_time = Some(fire_time);
        state.last_duration = Some(duration);
        state.last_result = Some(JobResult::Failed);
        state.run_count += 1;
        state.fail_count += 1;
    }

    pub(crate) fn snapshot(&self) -> JobStatus {
        let state = self.state.read().clone();
        JobStatus {
            id: self.definition.id.clone(),
            enabled: self.definition.enabled,
            schedule: self.definition.schedule.clone(),
            mode: self.definition.mode,
            last_fire_time: state.last_fire_time,
            last_duration: state.last_duration,
            last_result: state.last_result,
            next_fire_time: state.next_fire_time,
            run_count: state.run_count,
            fail_count: state.fail_count,
            running: state.running,
        }
    }
}

/// Holds a job's reentrancy guard; dropping it clears the flag on every
/// exit path, including cancellation and panics.
pub(crate) struct RunningGuard<'a> {
    record: &'a JobRecord,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.record.state.write().running = false;
    }
}
