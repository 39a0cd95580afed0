//! Next command handler
//!
//! Previews the upcoming fire times of a cron expression.

use jiff::Timestamp;

use crate::error::AppResult;
use crate::jobs::{CronExpression, JobError};

/// Handler for the next command
pub struct NextCommandHandler {
    expression: String,
    count: usize,
    after: Option<Timestamp>,
}

impl NextCommandHandler {
    /// Create a new next command handler
    ///
    /// `after` defaults to the current instant when `None`.
    pub fn new(expression: impl Into<String>, count: usize, after: Option<Timestamp>) -> Self {
        Self {
            expression: expression.into(),
            count,
            after,
        }
    }

    /// Print the fire times, one per line
    ///
    /// # Errors
    /// Returns an error when the expression cannot be parsed.
    pub fn execute(&self) -> AppResult<()> {
        let expression = CronExpression::parse(&self.expression).map_err(JobError::from)?;
        let after = self.after.unwrap_or_else(Timestamp::now);

        let fires = upcoming(&expression, after, self.count);
        for fire in &fires {
            println!("{fire}");
        }
        if fires.len() < self.count {
            println!(
                "No further fire time for '{}' after {}",
                expression,
                fires.last().copied().unwrap_or(after)
            );
        }
        Ok(())
    }
}

/// Up to `count` consecutive fire times strictly after `after`.
///
/// Stops early when the expression has no further fire time.
pub(crate) fn upcoming(expression: &CronExpression, after: Timestamp, count: usize) -> Vec<Timestamp> {
    let mut fires = Vec::with_capacity(count);
    let mut cursor = after;
    while fires.len() < count {
        match expression.next_fire_time(cursor) {
            Some(fire) => {
                fires.push(fire);
                cursor = fire;
            }
            None => break,
        }
    }
    fires
}
