//! List command handler
//!
//! Prints the effective job definitions after configuration overrides.

use std::fmt::Write;

use jiff::Timestamp;

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::{FirePlanner, JobDefinition};
use crate::runtime::Runtime;

/// Handler for the list command
pub struct ListCommandHandler {
    runtime: Runtime,
}

impl ListCommandHandler {
    /// Create a new list command handler
    pub fn new(config: Settings) -> Self {
        Self {
            runtime: Runtime::new(config),
        }
    }

    /// Print the job table to stdout
    ///
    /// # Errors
    /// Returns an error when a configuration override cannot be applied.
    pub fn execute(&self) -> AppResult<()> {
        print!("{}", self.render(Timestamp::now())?);
        Ok(())
    }

    fn render(&self, now: Timestamp) -> AppResult<String> {
        let registry = self.runtime.registry()?;
        let mut out = String::new();
        if !self.runtime.settings().jobs.enabled {
            out.push_str("Scheduling is globally disabled (jobs.enabled = false)\n");
        }
        out.push_str(&render_job_table(registry.definitions(), now));
        Ok(out)
    }
}

/// Render one line per job with its next fire time relative to `now`.
pub(crate) fn render_job_table(definitions: &[JobDefinition], now: Timestamp) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<32} {:<12} {:<8} NEXT FIRE",
        "ID", "SCHEDULE", "MODE", "ENABLED"
    );

    for definition in definitions {
        let next = if !definition.enabled {
            "-".to_string()
        } else {
            match definition.schedule.plan(now, true) {
                Some(plan) => plan.fire_at.to_string(),
                None => "never".to_string(),
            }
        };
        let _ = writeln!(
            out,
            "{:<20} {:<32} {:<12} {:<8} {}",
            definition.id,
            definition.schedule.to_string(),
            definition.mode.as_str(),
            definition.enabled,
            next
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobOverride;
    use crate::jobs::Schedule;
    use std::time::Duration;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_render_job_table() {
        let definitions = vec![
            JobDefinition::from_fn(
                "nightly",
                Schedule::cron("0 3 * * *").unwrap(),
                |_ctx| async { Ok(()) },
            ),
            JobDefinition::from_fn(
                "poll",
                Schedule::fixed_rate(Duration::from_secs(60))
                    .with_initial_delay(Duration::from_secs(10)),
                |_ctx| async { Ok(()) },
            ),
            JobDefinition::from_fn(
                "leap",
                Schedule::cron("0 0 30 2 *").unwrap(),
                |_ctx| async { Ok(()) },
            ),
            JobDefinition::from_fn(
                "off",
                Schedule::fixed_rate(Duration::from_secs(1)),
                |_ctx| async { Ok(()) },
            )
            .with_enabled(false),
        ];

        let table = render_job_table(&definitions, ts("2025-06-01T12:00:00Z"));
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with("nightly"));
        assert!(lines[1].contains("SINGLE_NODE"));
        assert!(lines[1].ends_with("2025-06-02T03:00:00Z"));
        assert!(lines[2].ends_with("2025-06-01T12:00:10Z"));
        assert!(lines[3].ends_with("never"));
        assert!(lines[4].contains("false"));
        assert!(lines[4].ends_with('-'));
    }

    #[test]
    fn test_render_applies_overrides() {
        let mut settings = Settings::default();
        settings.jobs.enabled = false;
        settings.jobs.items = vec![JobOverride {
            id: "heartbeat".to_string(),
            cron: Some("*/10 * * * *".to_string()),
            ..Default::default()
        }];

        let handler = ListCommandHandler::new(settings);
        let out = handler.render(ts("2025-06-01T12:03:00Z")).unwrap();

        assert!(out.starts_with("Scheduling is globally disabled"));
        let heartbeat = out.lines().find(|l| l.starts_with("heartbeat")).unwrap();
        assert!(heartbeat.contains("cron(*/10 * * * *)"));
        assert!(heartbeat.ends_with("2025-06-01T12:10:00Z"));
    }
}
