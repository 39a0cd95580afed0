use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use crate::jobs::types::{JobContext, JobTask};

/// Location of the log files written by the file logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    pub directory: PathBuf,
    /// Only files whose name starts with this are considered.
    pub prefix: String,
}

impl LogFiles {
    /// Derive the directory and name prefix from the configured log file
    /// path, e.g. `logs/app.log` gives `logs` and `app`.
    pub fn from_log_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { directory, prefix }
    }
}

/// Deletes log files not modified within the retention period.
#[derive(Debug, Clone)]
pub struct LogCleanupTask {
    files: LogFiles,
    retention: Duration,
}

impl LogCleanupTask {
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    pub fn new(files: LogFiles, retention: Duration) -> Self {
        Self { files, retention }
    }

    /// Remove expired files, returning how many were deleted.
    async fn sweep(&self, ctx: &JobContext) -> anyhow::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.files.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read log directory {}", self.files.directory.display())
                });
            }
        };

        let now = SystemTime::now();
        let mut deleted = 0;

        while let Some(entry) = entries.next_entry().await? {
            if ctx.is_cancelled() {
                anyhow::bail!("log cleanup cancelled after {deleted} files");
            }

            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&self.files.prefix) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.retention {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => ctx.logger.warn(
                    "job.log-cleanup.remove-failed",
                    json!({ "path": path.display().to_string(), "error": e.to_string() }),
                ),
            }
        }

        Ok(deleted)
    }
}

#[async_trait]
impl JobTask for LogCleanupTask {
    async fn execute(&self, ctx: JobContext) -> anyhow::Result<()> {
        let deleted = self.sweep(&ctx).await?;

        ctx.logger.info(
            "job.log-cleanup.done",
            json!({
                "directory": self.files.directory.display().to_string(),
                "deleted": deleted,
                "retention_days": self.retention.as_secs() / 86_400,
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::logging::{LoggerFactory, TracingLoggerFactory};
    use crate::jobs::types::Resources;
    use jiff::Timestamp;
    use tokio_util::sync::CancellationToken;

    fn context() -> JobContext {
        JobContext {
            job_id: "log-cleanup".to_string(),
            fire_time: Timestamp::now(),
            resources: Resources::new(),
            logger: TracingLoggerFactory.logger("fusion.jobs.log-cleanup"),
            cancellation_token: CancellationToken::new(),
        }
    }

    #[test]
    fn test_log_files_from_path() {
        let files = LogFiles::from_log_path("logs/app.log");
        assert_eq!(files.directory, PathBuf::from("logs"));
        assert_eq!(files.prefix, "app");

        let files = LogFiles::from_log_path("app.log");
        assert_eq!(files.directory, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_deletes_only_matching_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.log"), "current").unwrap();
        std::fs::write(dir.path().join("app.log.1"), "old").unwrap();
        std::fs::write(dir.path().join("other.txt"), "keep").unwrap();
        std::fs::create_dir(dir.path().join("app.archive")).unwrap();

        let task = LogCleanupTask::new(
            LogFiles {
                directory: dir.path().to_path_buf(),
                prefix: "app".to_string(),
            },
            Duration::ZERO,
        );
        task.execute(context()).await.unwrap();

        assert!(!dir.path().join("app.log").exists());
        assert!(!dir.path().join("app.log.1").exists());
        assert!(dir.path().join("other.txt").exists());
        assert!(dir.path().join("app.archive").exists());
    }

    #[tokio::test]
    async fn test_keeps_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.log"), "current").unwrap();

        let task = LogCleanupTask::new(
            LogFiles::from_log_path(dir.path().join("app.log")),
            LogCleanupTask::DEFAULT_RETENTION,
        );
        assert_eq!(task.sweep(&context()).await.unwrap(), 0);
        assert!(dir.path().join("app.log").exists());
    }

    #[tokio::test]
    async fn test_deletes_files_past_default_retention() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("app.2025-01-01.log");
        let fresh = dir.path().join("app.2025-01-09.log");
        std::fs::write(&stale, "old").unwrap();
        std::fs::write(&fresh, "new").unwrap();

        let eight_days_ago = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);
        filetime::set_file_mtime(&stale, filetime::FileTime::from_system_time(eight_days_ago))
            .unwrap();

        let task = LogCleanupTask::new(
            LogFiles::from_log_path(dir.path().join("app.log")),
            LogCleanupTask::DEFAULT_RETENTION,
        );
        assert_eq!(task.sweep(&context()).await.unwrap(), 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_cancelled_sweep_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.log"), "current").unwrap();

        let ctx = context();
        ctx.cancellation_token.cancel();
        let task = LogCleanupTask::new(
            LogFiles::from_log_path(dir.path().join("app.log")),
            Duration::ZERO,
        );
        assert!(task.sweep(&ctx).await.is_err());
        assert!(dir.path().join("app.log").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let task = LogCleanupTask::new(
            LogFiles::from_log_path(dir.path().join("missing/app.log")),
            Duration::ZERO,
        );
        assert_eq!(task.sweep(&context()).await.unwrap(), 0);
    }
}
