//! Distributed-aware job scheduler.
//!
//! Jobs are registered once at startup in a [`JobRegistry`] and fire on a
//! cron calendar or a fixed delay. `SINGLE_NODE` jobs take a cluster lock
//! before each tick so one process runs it; contention skips the tick.
//!
//! ```ignore
//! let mut registry = JobRegistry::new();
//! registry.register(
//!     JobDefinition::from_fn("refresh-cache", Schedule::cron("*/5 * * * *")?, |ctx| async move {
//!         ctx.logger.info("cache.refreshed", serde_json::json!({}));
//!         Ok(())
//!     })
//!     .with_mode(ExecutionMode::AllNodes),
//! )?;
//!
//! let scheduler = JobScheduler::builder(registry)
//!     .lock_manager(lock_manager)
//!     .build();
//! scheduler.start()?;
//! // ...
//! scheduler.shutdown(None).await;
//! ```

pub mod cron;
pub mod definition;
pub mod error;
pub mod executor;
pub mod listener;
pub mod logging;
pub mod registry;
pub mod schedule;
pub mod scheduler;
pub mod status;
pub mod tasks;
pub mod types;


pub use cron::{CronError, CronExpression, next_fire_time};
pub use definition::{JobDefinition, TaskFactory};
pub use error::JobError;
pub use executor::TickOutcome;
pub use listener::{JobExecutionListener, NoopListener};
pub use logging::{JobLogger, LoggerFactory, TracingLoggerFactory};
pub use registry::JobRegistry;
pub use schedule::{FirePlan, FirePlanner, Schedule};
pub use scheduler::{JobScheduler, JobSchedulerBuilder};
pub use types::{ExecutionMode, FnTask, JobContext, JobResult, JobStatus, JobTask, Resources};
