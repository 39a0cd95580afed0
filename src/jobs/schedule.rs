use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::jobs::cron::{CronError, CronExpression};

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Five-field UTC cron expression.
    Cron { expression: CronExpression },
    /// Fire every `interval_ms` after an optional initial delay.
    ///
    /// The name follows the configuration key but the behaviour is
    /// fixed-delay: the interval is measured from the end of the previous
    /// execution, so slow runs push later fires back instead of bunching up.
    FixedRate {
        interval_ms: u64,
        #[serde(default)]
        initial_delay_ms: u64,
    },
}

impl Schedule {
    pub fn cron(expression: &str) -> Result<Self, CronError> {
        Ok(Schedule::Cron {
            expression: CronExpression::parse(expression)?,
        })
    }

    pub fn fixed_rate(interval: Duration) -> Self {
        Schedule::FixedRate {
            interval_ms: interval.as_millis() as u64,
            initial_delay_ms: 0,
        }
    }

    /// Set the initial delay. Has no effect on cron schedules.
    pub fn with_initial_delay(self, delay: Duration) -> Self {
        match self {
            Schedule::FixedRate { interval_ms, .. } => Schedule::FixedRate {
                interval_ms,
                initial_delay_ms: delay.as_millis() as u64,
            },
            cron => cron,
        }
    }

    pub fn is_cron(&self) -> bool {
        matches!(self, Schedule::Cron { .. })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron { expression } => write!(f, "cron({expression})"),
            Schedule::FixedRate {
                interval_ms,
                initial_delay_ms: 0,
            } => write!(f, "every {interval_ms}ms"),
            Schedule::FixedRate {
                interval_ms,
                initial_delay_ms,
            } => write!(f, "every {interval_ms}ms after {initial_delay_ms}ms"),
        }
    }
}

/// The next fire computed by a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirePlan {
    /// Wall-clock instant the tick is expected to start.
    pub fire_at: Timestamp,
    /// How long the loop sleeps before running the tick.
    pub wait: Duration,
}

/// Computes the next fire of a scheduling loop.
///
/// Both schedule kinds go through this one interface, so the loop that
/// waits, ticks and records status is shared.
pub trait FirePlanner {
    /// Plan the next fire relative to `now`. `first` is true for the first
    /// fire of a loop. `None` means the loop can never fire again.
    fn plan(&self, now: Timestamp, first: bool) -> Option<FirePlan>;
}

impl FirePlanner for Schedule {
    fn plan(&self, now: Timestamp, first: bool) -> Option<FirePlan> {
        match self {
            Schedule::FixedRate {
                interval_ms,
                initial_delay_ms,
            } => {
                let wait_ms = if first { *initial_delay_ms } else { *interval_ms };
                Some(FirePlan {
                    fire_at: offset(now, wait_ms),
                    wait: Duration::from_millis(wait_ms),
                })
            }
            Schedule::Cron { expression } => {
                let fire_at = expression.next_fire_time(now)?;
                let wait_ms = (fire_at.as_millisecond() - now.as_millisecond()).max(0);
                Some(FirePlan {
                    fire_at,
                    wait: Duration::from_millis(wait_ms as u64),
                })
            }
        }
    }
}

fn offset(now: Timestamp, millis: u64) -> Timestamp {
    let target = now
        .as_millisecond()
        .saturating_add(i64::try_from(millis).unwrap_or(i64::MAX));
    Timestamp::from_millisecond(target).unwrap_or(Timestamp::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_fixed_rate_first_fire_uses_initial_delay() {
        let schedule =
            Schedule::fixed_rate(Duration::from_secs(10)).with_initial_delay(Duration::from_secs(3));
        let now = ts("2024-05-01T12:00:00Z");

        let first = schedule.plan(now, true).unwrap();
        assert_eq!(first.wait, Duration::from_secs(3));
        assert_eq!(first.fire_at, ts("2024-05-01T12:00:03Z"));

        let next = schedule.plan(now, false).unwrap();
        assert_eq!(next.wait, Duration::from_secs(10));
        assert_eq!(next.fire_at, ts("2024-05-01T12:00:10Z"));
    }

    #[test]
    fn test_cron_plan_waits_until_next_minute() {
        let schedule = Schedule::cron("*/15 * * * *").unwrap();
        let plan = schedule.plan(ts("2024-05-01T12:07:30Z"), true).unwrap();
        assert_eq!(plan.fire_at, ts("2024-05-01T12:15:00Z"));
        assert_eq!(plan.wait, Duration::from_secs(7 * 60 + 30));
    }

    #[test]
    fn test_cron_plan_none_when_unsatisfiable() {
        let schedule = Schedule::cron("0 0 30 2 *").unwrap();
        assert!(schedule.plan(ts("2024-05-01T12:00:00Z"), true).is_none());
    }

    #[test]
    fn test_initial_delay_ignored_for_cron() {
        let schedule = Schedule::cron("0 * * * *")
            .unwrap()
            .with_initial_delay(Duration::from_secs(5));
        assert!(schedule.is_cron());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Schedule::cron("0  3 * * *").unwrap().to_string(),
            "cron(0 3 * * *)"
        );
        assert_eq!(
            Schedule::fixed_rate(Duration::from_millis(250)).to_string(),
            "every 250ms"
        );
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(Schedule::fixed_rate(Duration::from_secs(1))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "fixed_rate", "interval_ms": 1000, "initial_delay_ms": 0 })
        );

        let cron: Schedule =
            serde_json::from_value(serde_json::json!({ "type": "cron", "expression": "0 * * * *" }))
                .unwrap();
        assert!(cron.is_cron());
    }
}
