use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::jobs::schedule::Schedule;
use crate::jobs::types::{ExecutionMode, FnTask, JobContext, JobTask, Resources};

/// Builds the task instance for one execution.
pub type TaskFactory = Arc<dyn Fn(&Resources) -> anyhow::Result<Arc<dyn JobTask>> + Send + Sync>;

/// Static description of a scheduled job.
#[derive(Clone)]
pub struct JobDefinition {
    /// Unique identifier, kebab-case by convention (`clean-expired-tokens`).
    pub id: String,
    pub schedule: Schedule,
    pub mode: ExecutionMode,
    /// TTL of the cluster lock; only used in `SINGLE_NODE` mode. Should
    /// exceed the longest expected execution.
    pub lock_ttl: Duration,
    pub enabled: bool,
    factory: TaskFactory,
}

impl JobDefinition {
    pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

    /// Define a job whose task is built by `factory` before every execution.
    pub fn new<F>(id: impl Into<String>, schedule: Schedule, factory: F) -> Self
    where
        F: Fn(&Resources) -> anyhow::Result<Arc<dyn JobTask>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            schedule,
            mode: ExecutionMode::default(),
            lock_ttl: Self::DEFAULT_LOCK_TTL,
            enabled: true,
            factory: Arc::new(factory),
        }
    }

    /// Define a job that reuses one task instance for every execution.
    pub fn from_task<T>(id: impl Into<String>, schedule: Schedule, task: T) -> Self
    where
        T: JobTask + 'static,
    {
        let task: Arc<dyn JobTask> = Arc::new(task);
        Self::new(id, schedule, move |_| Ok(Arc::clone(&task)))
    }

    /// Define a job from an async closure.
    pub fn from_fn<F, Fut>(id: impl Into<String>, schedule: Schedule, f: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::from_task(id, schedule, FnTask(f))
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn create_task(&self, resources: &Resources) -> anyhow::Result<Arc<dyn JobTask>> {
        (self.factory)(resources)
    }

    /// Lock key shared by every process running this job.
    pub fn lock_key(&self) -> String {
        format!("job:{}", self.id)
    }
}

impl fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("id", &self.id)
            .field("schedule", &self.schedule)
            .field("mode", &self.mode)
            .field("lock_ttl", &self.lock_ttl)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
