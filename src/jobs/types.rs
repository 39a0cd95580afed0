use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize, Serializer};
use tokio_util::sync::CancellationToken;

use crate::jobs::logging::JobLogger;
use crate::jobs::schedule::Schedule;

/// How a job is coordinated across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Every process runs every tick.
    AllNodes,
    /// One process per tick, coordinated through the lock manager.
    #[default]
    SingleNode,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::AllNodes => "ALL_NODES",
            ExecutionMode::SingleNode => "SINGLE_NODE",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "ALL_NODES" => Ok(ExecutionMode::AllNodes),
            "SINGLE_NODE" => Ok(ExecutionMode::SingleNode),
            _ => Err(format!(
                "Invalid execution mode '{s}'. Valid modes are: ALL_NODES, SINGLE_NODE"
            )),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the most recent tick of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobResult {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Success => write!(f, "success"),
            JobResult::Failed => write!(f, "failed"),
            JobResult::Skipped => write!(f, "skipped"),
        }
    }
}

/// Point-in-time copy of a job's execution status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub enabled: bool,
    pub schedule: Schedule,
    pub mode: ExecutionMode,
    pub last_fire_time: Option<Timestamp>,
    #[serde(rename = "last_duration_ms", serialize_with = "serialize_millis")]
    pub last_duration: Option<Duration>,
    pub last_result: Option<JobResult>,
    /// Millisecond precision for fixed-rate jobs, minute precision for cron.
    pub next_fire_time: Option<Timestamp>,
    pub run_count: u64,
    pub fail_count: u64,
    pub running: bool,
}

impl JobStatus {
    /// Executions that returned normally.
    pub fn success_count(&self) -> u64 {
        self.run_count - self.fail_count
    }
}

fn serialize_millis<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

/// Shared dependencies handed to job factories and job bodies, keyed by type.
#[derive(Clone, Default)]
pub struct Resources {
    entries: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency, replacing any previous value of the same type.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(Arc::new(value));
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        Arc::make_mut(&mut self.entries).insert(TypeId::of::<T>(), value);
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Like [`get`](Self::get) but fails with a message naming the missing type.
    pub fn require<T: Any + Send + Sync>(&self) -> anyhow::Result<Arc<T>> {
        self.get::<T>()
            .ok_or_else(|| anyhow::anyhow!("Resource not registered: {}", type_name::<T>()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Job execution context passed to tasks, fresh for every execution.
#[derive(Clone)]
pub struct JobContext {
    pub job_id: String,
    pub fire_time: Timestamp,
    pub resources: Resources,
    pub logger: Arc<dyn JobLogger>,
    pub cancellation_token: CancellationToken,
}

impl JobContext {
    /// True once the scheduler is shutting down.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Resolves when the scheduler starts shutting down.
    pub async fn cancelled(&self) {
        self.cancellation_token.cancelled().await
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("fire_time", &self.fire_time)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Body of a scheduled job.
///
/// An `Err` (or a panic) marks the tick FAILED. When the scheduler is shutting
/// down, an `Err` returned after observing cancellation is not counted as a
/// failure.
#[async_trait]
pub trait JobTask: Send + Sync {
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`JobTask`].
pub struct FnTask<F>(pub F);

#[async_trait]
impl<F, Fut> JobTask for FnTask<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Database(&'static str);

    #[test]
    fn test_execution_mode_from_str() {
        assert_eq!("SINGLE_NODE".parse::<ExecutionMode>().unwrap(), ExecutionMode::SingleNode);
        assert_eq!("all_nodes".parse::<ExecutionMode>().unwrap(), ExecutionMode::AllNodes);
        assert_eq!("all-nodes".parse::<ExecutionMode>().unwrap(), ExecutionMode::AllNodes);
        assert!("both".parse::<ExecutionMode>().is_err());
        assert_eq!(ExecutionMode::default(), ExecutionMode::SingleNode);
    }

    #[test]
    fn test_execution_mode_serde() {
        assert_eq!(
            serde_json::to_string(&ExecutionMode::AllNodes).unwrap(),
            "\"ALL_NODES\""
        );
        let mode: ExecutionMode = serde_json::from_str("\"SINGLE_NODE\"").unwrap();
        assert_eq!(mode, ExecutionMode::SingleNode);
    }

    #[test]
    fn test_resources_lookup_by_type() {
        let resources = Resources::new().with(Database("main")).with(42u32);
        assert_eq!(resources.len(), 2);
        assert_eq!(*resources.get::<Database>().unwrap(), Database("main"));
        assert_eq!(*resources.get::<u32>().unwrap(), 42);
        assert!(resources.get::<String>().is_none());

        let err = resources.require::<String>().unwrap_err();
        assert!(err.to_string().contains("String"));
    }

    #[test]
    fn test_resources_clone_is_independent_after_insert() {
        let base = Resources::new().with(1u8);
        let mut extended = base.clone();
        extended.insert(Arc::new(Database("extra")));
        assert!(base.get::<Database>().is_none());
        assert!(extended.get::<Database>().is_some());
    }

    #[test]
    fn test_status_serializes_duration_as_millis() {
        let status = JobStatus {
            id: "a".to_string(),
            enabled: true,
            schedule: Schedule::fixed_rate(Duration::from_secs(1)),
            mode: ExecutionMode::AllNodes,
            last_fire_time: None,
            last_duration: Some(Duration::from_millis(1500)),
            last_result: Some(JobResult::Success),
            next_fire_time: None,
            run_count: 3,
            fail_count: 1,
            running: false,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["last_duration_ms"], 1500);
        assert_eq!(json["last_result"], "success");
        assert_eq!(status.success_count(), 2);
    }
}
