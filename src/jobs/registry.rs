use std::time::Duration;

use crate::config::settings::{JobOverride, JobsSettings};
use crate::jobs::definition::JobDefinition;
use crate::jobs::error::JobError;
use crate::jobs::schedule::Schedule;

/// Static list of the jobs a process hosts.
///
/// Definitions are checked as they are registered, so a bad id or schedule
/// fails before the scheduler is built rather than at the first tick.
#[derive(Debug, Default)]
pub struct JobRegistry {
    definitions: Vec<JobDefinition>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job definition
    pub fn register(&mut self, definition: JobDefinition) -> Result<&mut Self, JobError> {
        validate(&definition)?;
        if self.get(&definition.id).is_some() {
            return Err(JobError::AlreadyExists(definition.id));
        }
        self.definitions.push(definition);
        Ok(self)
    }

    pub fn get(&self, job_id: &str) -> Option<&JobDefinition> {
        self.definitions.iter().find(|d| d.id == job_id)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[JobDefinition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<JobDefinition> {
        self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Merge `[[jobs.items]]` overrides into the registered definitions.
    ///
    /// Overrides naming an unregistered job are logged and ignored. A
    /// definition left invalid by its override is rejected and the registry
    /// is not modified.
    pub fn apply_overrides(&mut self, settings: &JobsSettings) -> Result<(), JobError> {
        let mut merged = self.definitions.clone();

        for item in &settings.items {
            let Some(definition) = merged.iter_mut().find(|d| d.id == item.id) else {
                tracing::warn!(job_id = %item.id, "Ignoring override for unregistered job");
                continue;
            };
            apply_override(definition, item)?;
            validate(definition)?;
            tracing::debug!(
                job_id = %definition.id,
                schedule = %definition.schedule,
                mode = %definition.mode,
                enabled = definition.enabled,
                "Applied job override"
            );
        }

        self.definitions = merged;
        Ok(())
    }
}

fn apply_override(definition: &mut JobDefinition, item: &JobOverride) -> Result<(), JobError> {
    if let Some(cron) = &item.cron {
        definition.schedule = Schedule::cron(cron)?;
    } else if let Some(interval_ms) = item.fixed_rate_ms {
        let initial_delay_ms = match (&definition.schedule, item.initial_delay_ms) {
            (_, Some(delay)) => delay,
            (Schedule::FixedRate { initial_delay_ms, .. }, None) => *initial_delay_ms,
            (Schedule::Cron { .. }, None) => 0,
        };
        definition.schedule = Schedule::FixedRate {
            interval_ms,
            initial_delay_ms,
        };
    } else if let Some(delay) = item.initial_delay_ms {
        match &definition.schedule {
            Schedule::FixedRate { .. } => {
                definition.schedule = definition
                    .schedule
                    .clone()
                    .with_initial_delay(Duration::from_millis(delay));
            }
            Schedule::Cron { .. } => tracing::warn!(
                job_id = %definition.id,
                "initial_delay_ms has no effect on a cron schedule"
            ),
        }
    }

    if let Some(mode) = item.mode {
        definition.mode = mode;
    }
    if let Some(ttl_ms) = item.lock_ttl_ms {
        definition.lock_ttl = Duration::from_millis(ttl_ms);
    }
    if let Some(enabled) = item.enabled {
        definition.enabled = enabled;
    }
    Ok(())
}

fn validate(definition: &JobDefinition) -> Result<(), JobError> {
    let invalid = |reason: &str| JobError::InvalidSchedule {
        job_id: definition.id.clone(),
        reason: reason.to_string(),
    };

    if definition.id.trim().is_empty() {
        return Err(invalid("job id must not be empty"));
    }
    if let Schedule::FixedRate { interval_ms: 0, .. } = definition.schedule {
        return Err(invalid("fixed rate interval must be greater than zero"));
    }
    if definition.lock_ttl.is_zero() {
        return Err(invalid("lock TTL must be greater than zero"));
    }
    Ok(())
}
