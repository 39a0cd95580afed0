use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jiff::Timestamp;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::settings::JobsSettings;
use crate::jobs::error::JobError;
use crate::jobs::executor::{JobExecutor, TickOutcome};
use crate::jobs::listener::{JobExecutionListener, NoopListener};
use crate::jobs::logging::{
    JobLogger, LoggerFactory, SCHEDULER_LOGGER, TracingLoggerFactory, job_logger_name,
};
use crate::jobs::registry::JobRegistry;
use crate::jobs::schedule::FirePlanner;
use crate::jobs::status::JobRecord;
use crate::jobs::types::{ExecutionMode, JobStatus, Resources};
use crate::lock::LockManager;

/// Runs every registered job on its own schedule.
///
/// Each enabled job gets one loop task; all loops and manual triggers are
/// spawned on a shared [`TaskTracker`] and stopped through one
/// [`CancellationToken`], so a failing job never affects its siblings while
/// [`shutdown`](Self::shutdown) reaches all of them.
pub struct JobScheduler {
    records: Vec<Arc<JobRecord>>,
    index: HashMap<String, usize>,
    executor: Arc<JobExecutor>,
    logger: Arc<dyn JobLogger>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    shutdown_timeout: Duration,
    started: AtomicBool,
}

impl JobScheduler {
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn builder(registry: JobRegistry) -> JobSchedulerBuilder {
        JobSchedulerBuilder::new(registry)
    }

    /// Spawn one scheduling loop per enabled job.
    ///
    /// Must be called from within a tokio runtime. Returns immediately; the
    /// loops run until [`shutdown`](Self::shutdown).
    pub fn start(&self) -> Result<(), JobError> {
        if self.shutdown.is_cancelled() {
            return Err(JobError::ShutDown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(JobError::AlreadyStarted);
        }

        let enabled: Vec<&Arc<JobRecord>> = self
            .records
            .iter()
            .filter(|record| record.definition.enabled)
            .collect();

        self.logger.info(
            "job.scheduler.start",
            json!({
                "jobs": enabled.iter().map(|r| r.id()).collect::<Vec<_>>(),
                "total": self.records.len(),
                "global_enabled": self.executor.global_enabled(),
            }),
        );

        if !self.executor.has_lock_manager() {
            let single_node: Vec<&str> = enabled
                .iter()
                .filter(|r| r.definition.mode == ExecutionMode::SingleNode)
                .map(|r| r.id())
                .collect();
            if !single_node.is_empty() {
                self.logger.warn(
                    "job.misconfigured",
                    json!({
                        "jobs": single_node,
                        "error": "SINGLE_NODE jobs scheduled without a lock manager",
                    }),
                );
            }
        }

        for record in enabled {
            let record = Arc::clone(record);
            let executor = Arc::clone(&self.executor);
            let shutdown = self.shutdown.clone();
            self.tracker
                .spawn(run_loop(record, executor, shutdown));
        }

        Ok(())
    }

    /// Run one tick of `job_id` now.
    ///
    /// Ignores the enabled switches but not the reentrancy guard or the
    /// cluster lock. The returned handle resolves to the tick's outcome.
    pub fn trigger(
        &self,
        job_id: &str,
    ) -> Result<JoinHandle<Result<TickOutcome, JobError>>, JobError> {
        let record = self
            .record(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        if self.shutdown.is_cancelled() {
            return Err(JobError::ShutDown);
        }
        if record.definition.mode == ExecutionMode::SingleNode && !self.executor.has_lock_manager()
        {
            return Err(JobError::LockManagerMissing(job_id.to_string()));
        }

        let record = Arc::clone(record);
        let executor = Arc::clone(&self.executor);
        Ok(self
            .tracker
            .spawn(async move { executor.run_tick(&record, true).await }))
    }

    /// Copies of every job's status, in registration order.
    pub fn snapshot(&self) -> Vec<JobStatus> {
        self.records.iter().map(|record| record.snapshot()).collect()
    }

    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.record(job_id).map(|record| record.snapshot())
    }

    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancel every loop and wait for them to exit.
    ///
    /// Waits at most `timeout`, or the configured shutdown timeout when
    /// `None`. Executions that ignore cancellation are left running. Returns
    /// `true` when every task finished in time.
    pub async fn shutdown(&self, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(self.shutdown_timeout);

        self.shutdown.cancel();
        self.tracker.close();

        let completed = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();

        let fields = json!({
            "timeout_ms": timeout.as_millis() as u64,
            "completed": completed,
            "pending_tasks": self.tracker.len(),
        });
        if completed {
            self.logger.info("job.scheduler.shutdown", fields);
        } else {
            self.logger.warn("job.scheduler.shutdown", fields);
        }

        completed
    }

    fn record(&self, job_id: &str) -> Option<&Arc<JobRecord>> {
        self.index.get(job_id).map(|&i| &self.records[i])
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One job's scheduling loop: plan, wait, tick, repeat.
async fn run_loop(record: Arc<JobRecord>, executor: Arc<JobExecutor>, shutdown: CancellationToken) {
    let schedule = &record.definition.schedule;
    let mut first = true;
    let mut last_fire: Option<Timestamp> = None;

    loop {
        let now = Timestamp::now();
        // A cron tick may finish before its own minute is over.
        let after = last_fire.map_or(now, |fire| fire.max(now));

        let Some(plan) = schedule.plan(after, first) else {
            record.set_next_fire_time(None);
            record.logger.error(
                "job.cron.no-next",
                json!({ "job_id": record.id(), "schedule": schedule.to_string() }),
            );
            return;
        };
        first = false;
        record.set_next_fire_time(Some(plan.fire_at));

        let wait = if after > now {
            plan.wait
                + Duration::from_millis((after.as_millisecond() - now.as_millisecond()) as u64)
        } else {
            plan.wait
        };

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }
        last_fire = Some(plan.fire_at);
        if !schedule.is_cron() {
            // The running fire is no longer upcoming; the next one is at least an interval away.
            record.set_next_fire_time(schedule.plan(Timestamp::now(), false).map(|p| p.fire_at));
        }

        match executor.run_tick(&record, false).await {
            Ok(TickOutcome::Cancelled) => return,
            Ok(_) => {}
            Err(e) => {
                record.logger.error(
                    "job.loop.stopped",
                    json!({ "job_id": record.id(), "error": e.to_string() }),
                );
                return;
            }
        }

        if shutdown.is_cancelled() {
            return;
        }
    }
}

/// Collects the collaborators of a [`JobScheduler`].
pub struct JobSchedulerBuilder {
    registry: JobRegistry,
    global_enabled: bool,
    shutdown_timeout: Duration,
    lock_manager: Option<Arc<dyn LockManager>>,
    listener: Arc<dyn JobExecutionListener>,
    logger_factory: Arc<dyn LoggerFactory>,
    resources: Resources,
}

impl JobSchedulerBuilder {
    fn new(registry: JobRegistry) -> Self {
        Self {
            registry,
            global_enabled: true,
            shutdown_timeout: JobScheduler::DEFAULT_SHUTDOWN_TIMEOUT,
            lock_manager: None,
            listener: Arc::new(NoopListener),
            logger_factory: Arc::new(TracingLoggerFactory),
            resources: Resources::new(),
        }
    }

    /// Apply the global switch and shutdown timeout from `[jobs]`.
    pub fn settings(self, settings: &JobsSettings) -> Self {
        self.global_enabled(settings.enabled)
            .shutdown_timeout(Duration::from_millis(settings.shutdown_timeout_ms))
    }

    /// When false, scheduled ticks do nothing; manual triggers still run.
    pub fn global_enabled(mut self, enabled: bool) -> Self {
        self.global_enabled = enabled;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn lock_manager(mut self, manager: Arc<dyn LockManager>) -> Self {
        self.lock_manager = Some(manager);
        self
    }

    pub fn maybe_lock_manager(mut self, manager: Option<Arc<dyn LockManager>>) -> Self {
        self.lock_manager = manager;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn JobExecutionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn logger_factory(mut self, factory: Arc<dyn LoggerFactory>) -> Self {
        self.logger_factory = factory;
        self
    }

    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    pub fn build(self) -> JobScheduler {
        let shutdown = CancellationToken::new();
        let logger = self.logger_factory.logger(SCHEDULER_LOGGER);

        let mut records = Vec::with_capacity(self.registry.len());
        let mut index = HashMap::with_capacity(self.registry.len());
        for definition in self.registry.into_definitions() {
            let job_logger = self.logger_factory.logger(&job_logger_name(&definition.id));
            index.insert(definition.id.clone(), records.len());
            records.push(Arc::new(JobRecord::new(definition, job_logger)));
        }

        logger.info(
            "job.init",
            json!({
                "jobs": records
                    .iter()
                    .map(|r| json!({
                        "id": r.id(),
                        "schedule": r.definition.schedule.to_string(),
                        "mode": r.definition.mode.as_str(),
                        "enabled": r.definition.enabled,
                    }))
                    .collect::<Vec<_>>(),
                "lock_manager": self.lock_manager.is_some(),
            }),
        );

        let executor = JobExecutor::new(
            self.lock_manager,
            self.listener,
            self.resources,
            self.global_enabled,
            shutdown.clone(),
        );

        JobScheduler {
            records,
            index,
            executor: Arc::new(executor),
            logger,
            shutdown,
            tracker: TaskTracker::new(),
            shutdown_timeout: self.shutdown_timeout,
            started: AtomicBool::new(false),
        }
    }
}
