use async_trait::async_trait;
use serde_json::json;

use crate::jobs::types::{JobContext, JobTask};

/// Logs that the process is alive, once per tick on every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatTask;

#[async_trait]
impl JobTask for HeartbeatTask {
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()> {
        ctx.logger.info(
            "job.heartbeat",
            json!({
                "host": host_name().await,
                "pid": std::process::id(),
                "fire_time": ctx.fire_time.to_string(),
            }),
        );
        Ok(())
    }
}

async fn host_name() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    match tokio::fs::read_to_string("/etc/hostname").await {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => "unknown".to_string(),
    }
}
