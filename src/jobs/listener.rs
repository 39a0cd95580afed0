use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;

/// Observer of job executions, e.g. for metrics or alerting.
///
/// Every method defaults to doing nothing.
#[async_trait]
pub trait JobExecutionListener: Send + Sync {
    /// The job body is about to run.
    async fn on_start(&self, _job_id: &str, _fire_time: Timestamp) {}

    async fn on_success(&self, _job_id: &str, _fire_time: Timestamp, _duration: Duration) {}

    async fn on_failure(
        &self,
        _job_id: &str,
        _fire_time: Timestamp,
        _duration: Duration,
        _error: &anyhow::Error,
    ) {
    }

    /// A `SINGLE_NODE` tick did not get the cluster lock.
    async fn on_skipped(&self, _job_id: &str, _fire_time: Timestamp) {}
}

/// Listener used when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl JobExecutionListener for NoopListener {}
