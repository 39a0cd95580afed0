use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use jiff::Timestamp;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::jobs::error::JobError;
use crate::jobs::listener::JobExecutionListener;
use crate::jobs::status::JobRecord;
use crate::jobs::types::{ExecutionMode, JobContext, Resources};
use crate::lock::{DistributedLock, LockManager};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Scheduled tick of a disabled job (or with scheduling globally off).
    Disabled,
    /// The previous tick of this job was still running.
    AlreadyRunning,
    /// Another process holds the cluster lock, or the lock backend failed.
    Skipped,
    Succeeded,
    Failed,
    /// The body gave up because the scheduler is shutting down.
    Cancelled,
}

/// Runs ticks: reentrancy guard, cluster lock, job body and status updates.
pub(crate) struct JobExecutor {
    lock_manager: Option<Arc<dyn LockManager>>,
    listener: Arc<dyn JobExecutionListener>,
    resources: Resources,
    global_enabled: bool,
    shutdown: CancellationToken,
}

impl JobExecutor {
    pub(crate) fn new(
        lock_manager: Option<Arc<dyn LockManager>>,
        listener: Arc<dyn JobExecutionListener>,
        resources: Resources,
        global_enabled: bool,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            lock_manager,
            listener,
            resources,
            global_enabled,
            shutdown,
        }
    }

    pub(crate) fn has_lock_manager(&self) -> bool {
        self.lock_manager.is_some()
    }

    pub(crate) fn global_enabled(&self) -> bool {
        self.global_enabled
    }

    /// Run one tick of `record`'s job.
    ///
    /// `manual` ticks come from `trigger` and ignore the enabled switches.
    /// The only error is a `SINGLE_NODE` job without a lock manager; every
    /// failure of the job itself is contained and reported as an outcome.
    pub(crate) async fn run_tick(
        &self,
        record: &JobRecord,
        manual: bool,
    ) -> Result<TickOutcome, JobError> {
        let definition = &record.definition;
        if !manual && (!self.global_enabled || !definition.enabled) {
            return Ok(TickOutcome::Disabled);
        }

        let Some(_guard) = record.try_begin() else {
            record.logger.debug(
                "job.overlap",
                json!({ "job_id": definition.id, "manual": manual }),
            );
            return Ok(TickOutcome::AlreadyRunning);
        };

        let fire_time = Timestamp::now();

        let lock = match definition.mode {
            ExecutionMode::AllNodes => None,
            ExecutionMode::SingleNode => {
                let Some(manager) = &self.lock_manager else {
                    record.logger.error(
                        "job.misconfigured",
                        json!({
                            "job_id": definition.id,
                            "mode": definition.mode.as_str(),
                            "error": "no lock manager bound",
                        }),
                    );
                    return Err(JobError::LockManagerMissing(definition.id.clone()));
                };

                match manager.try_lock(&definition.lock_key(), definition.lock_ttl).await {
                    Ok(Some(lock)) => Some(lock),
                    Ok(None) => {
                        self.skip(record, fire_time, "lock-held", None).await;
                        return Ok(TickOutcome::Skipped);
                    }
                    Err(e) => {
                        self.skip(record, fire_time, "lock-error", Some(e.to_string()))
                            .await;
                        return Ok(TickOutcome::Skipped);
                    }
                }
            }
        };

        let outcome = self.execute(record, fire_time).await;

        if let Some(lock) = lock {
            release(record, lock.as_ref()).await;
        }

        Ok(outcome)
    }

    async fn skip(
        &self,
        record: &JobRecord,
        fire_time: Timestamp,
        reason: &str,
        error: Option<String>,
    ) {
        record.record_skipped(fire_time);

        let backend_failed = error.is_some();
        let fields = json!({
            "job_id": record.id(),
            "fire_time": fire_time.to_string(),
            "reason": reason,
            "error": error,
        });
        if backend_failed {
            record.logger.warn("job.skipped", fields);
        } else {
            record.logger.info("job.skipped", fields);
        }

        self.listener.on_skipped(record.id(), fire_time).await;
    }

    async fn execute(&self, record: &JobRecord, fire_time: Timestamp) -> TickOutcome {
        let definition = &record.definition;
        let cancellation = self.shutdown.child_token();
        let ctx = JobContext {
            job_id: definition.id.clone(),
            fire_time,
            resources: self.resources.clone(),
            logger: Arc::clone(&record.logger),
            cancellation_token: cancellation.clone(),
        };

        record.logger.info(
            "job.started",
            json!({ "job_id": definition.id, "fire_time": fire_time.to_string() }),
        );
        self.listener.on_start(&definition.id, fire_time).await;

        let started = Instant::now();
        let result = AssertUnwindSafe(async {
            let task = definition.create_task(&self.resources)?;
            task.execute(ctx).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(anyhow::anyhow!("job panicked: {}", panic_message(&*panic))));
        let duration = started.elapsed();
        let duration_ms = duration.as_millis() as u64;

        match result {
            Ok(()) => {
                record.record_success(fire_time, duration);
                record.logger.info(
                    "job.done",
                    json!({
                        "job_id": definition.id,
                        "fire_time": fire_time.to_string(),
                        "duration_ms": duration_ms,
                    }),
                );
                self.listener
                    .on_success(&definition.id, fire_time, duration)
                    .await;
                TickOutcome::Succeeded
            }
            Err(e) if cancellation.is_cancelled() => {
                record.logger.info(
                    "job.cancelled",
                    json!({
                        "job_id": definition.id,
                        "fire_time": fire_time.to_string(),
                        "duration_ms": duration_ms,
                        "error": format!("{e:#}"),
                    }),
                );
                TickOutcome::Cancelled
            }
            Err(e) => {
                record.record_failure(fire_time, duration);
                record.logger.error(
                    "job.failed",
                    json!({
                        "job_id": definition.id,
                        "fire_time": fire_time.to_string(),
                        "duration_ms": duration_ms,
                        "error": format!("{e:#}"),
                    }),
                );
                self.listener
                    .on_failure(&definition.id, fire_time, duration, &e)
                    .await;
                TickOutcome::Failed
            }
        }
    }
}

async fn release(record: &JobRecord, lock: &dyn DistributedLock) {
    match lock.release().await {
        Ok(true) => {}
        Ok(false) => record.logger.warn(
            "job.lock.expired",
            json!({ "job_id": record.id(), "key": lock.key() }),
        ),
        Err(e) => record.logger.warn(
            "job.lock.release-failed",
            json!({ "job_id": record.id(), "key": lock.key(), "error": e.to_string() }),
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
