//! Five-field cron evaluation in UTC.
//!
//! Fields are `minute hour day-of-month month day-of-week` with the ranges
//! 0-59, 0-23, 1-31, 1-12 and 0-6 (0 = Sunday). Each field accepts `*`, a
//! single value, a comma separated list, `a-b`, `*/n` and `a-b/n`.
//!
//! Day-of-month and day-of-week are combined with AND: `0 0 13 * 5` only
//! fires on a Friday the 13th, unlike the classic cron "either matches" rule.

use std::fmt;
use std::str::FromStr;

use jiff::tz::TimeZone;
use jiff::{Timestamp, civil};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Upper bound on the minutes visited while searching for the next match.
pub const MAX_SCAN_MINUTES: u32 = 370 * 24 * 60;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

/// A cron expression that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid cron expression '{expression}': {reason}")]
pub struct CronError {
    pub expression: String,
    pub reason: String,
}

impl CronError {
    fn new(expression: &str, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Set of allowed values for one field, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    fn contains(self, value: u32) -> bool {
        value < 64 && (self.0 >> value) & 1 == 1
    }

    fn insert_stepped(&mut self, start: u32, end: u32, step: u32) {
        let mut v = start;
        while v <= end {
            self.0 |= 1 << v;
            v += step;
        }
    }

    fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23 };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12 };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 6 };

/// A parsed, validated cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
}

impl CronExpression {
    /// Parse and validate an expression. Every field is resolved to its set
    /// of allowed values here, so a bad expression never reaches a scheduler.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronError::new(
                expression,
                format!("expected 5 fields, got {}", parts.len()),
            ));
        }

        Ok(Self {
            source: parts.join(" "),
            minutes: parse_field(expression, parts[0], MINUTE)?,
            hours: parse_field(expression, parts[1], HOUR)?,
            days_of_month: parse_field(expression, parts[2], DAY_OF_MONTH)?,
            months: parse_field(expression, parts[3], MONTH)?,
            days_of_week: parse_field(expression, parts[4], DAY_OF_WEEK)?,
        })
    }

    /// The normalized source text (fields separated by single spaces).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compute the first matching minute strictly after `after`.
    ///
    /// Returns `None` when nothing matches within [`MAX_SCAN_MINUTES`] of
    /// scanned candidates, e.g. for `0 0 30 2 *`.
    pub fn next_fire_time(&self, after: Timestamp) -> Option<Timestamp> {
        let start = after.to_zoned(TimeZone::UTC).datetime();
        let mut cursor = Cursor {
            year: i32::from(start.year()),
            month: start.month() as u32,
            day: start.day() as u32,
            hour: start.hour() as u32,
            minute: start.minute() as u32 + 1,
        };
        cursor.carry();

        let mut scanned = 0u32;
        while scanned < MAX_SCAN_MINUTES {
            if cursor.year > i32::from(civil::Date::MAX.year()) {
                return None;
            }

            if !self.months.contains(cursor.month) {
                cursor.next_month();
                continue;
            }

            // Past the end of the month: day overflow from the cursor.
            let Some(date) = cursor.date() else {
                cursor.next_month();
                continue;
            };

            let weekday = date.weekday().to_sunday_zero_offset() as u32;
            if !self.days_of_month.contains(cursor.day) || !self.days_of_week.contains(weekday) {
                cursor.next_day();
                scanned += MINUTES_PER_DAY;
                continue;
            }

            if !self.hours.contains(cursor.hour) {
                cursor.next_hour();
                scanned += MINUTES_PER_HOUR;
                continue;
            }

            if !self.minutes.contains(cursor.minute) {
                cursor.minute += 1;
                cursor.carry();
                scanned += 1;
                continue;
            }

            return cursor.to_timestamp();
        }

        None
    }

    /// Whether a UTC civil date-time satisfies all five fields (seconds ignored).
    pub fn matches(&self, dt: civil::DateTime) -> bool {
        self.minutes.contains(dt.minute() as u32)
            && self.hours.contains(dt.hour() as u32)
            && self.days_of_month.contains(dt.day() as u32)
            && self.months.contains(dt.month() as u32)
            && self
                .days_of_week
                .contains(dt.weekday().to_sunday_zero_offset() as u32)
    }
}

/// Parse `expression` and compute its next fire time after `after`.
pub fn next_fire_time(expression: &str, after: Timestamp) -> Result<Option<Timestamp>, CronError> {
    Ok(CronExpression::parse(expression)?.next_fire_time(after))
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for CronExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for CronExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Field parsing
// ============================================================================

fn parse_field(expression: &str, field: &str, spec: FieldSpec) -> Result<FieldSet, CronError> {
    let mut set = FieldSet(0);
    for part in field.split(',') {
        parse_part(expression, part.trim(), spec, &mut set)?;
    }
    if set.is_empty() {
        return Err(CronError::new(
            expression,
            format!("{} field '{}' resolves to no values", spec.name, field),
        ));
    }
    Ok(set)
}

fn parse_part(
    expression: &str,
    part: &str,
    spec: FieldSpec,
    set: &mut FieldSet,
) -> Result<(), CronError> {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, Some(parse_step(expression, step, spec)?)),
        None => (part, None),
    };

    let (start, end) = if range == "*" {
        (spec.min, spec.max)
    } else if let Some((lo, hi)) = range.split_once('-') {
        let start = parse_value(expression, lo, spec)?;
        let end = parse_value(expression, hi, spec)?;
        if start > end {
            return Err(CronError::new(
                expression,
                format!("{} range '{}' has start greater than end", spec.name, range),
            ));
        }
        (start, end)
    } else {
        if step.is_some() {
            return Err(CronError::new(
                expression,
                format!("{} step '{}' needs '*' or a range", spec.name, part),
            ));
        }
        let value = parse_value(expression, range, spec)?;
        (value, value)
    };

    set.insert_stepped(start, end, step.unwrap_or(1));
    Ok(())
}

fn parse_value(expression: &str, raw: &str, spec: FieldSpec) -> Result<u32, CronError> {
    let value: u32 = raw.parse().map_err(|_| {
        CronError::new(expression, format!("invalid {} value '{}'", spec.name, raw))
    })?;
    if value < spec.min || value > spec.max {
        return Err(CronError::new(
            expression,
            format!(
                "{} value {} out of range {}-{}",
                spec.name, value, spec.min, spec.max
            ),
        ));
    }
    Ok(value)
}

fn parse_step(expression: &str, raw: &str, spec: FieldSpec) -> Result<u32, CronError> {
    let step: i64 = raw.parse().map_err(|_| {
        CronError::new(expression, format!("invalid {} step '{}'", spec.name, raw))
    })?;
    if step <= 0 {
        return Err(CronError::new(
            expression,
            format!("{} step must be positive, got {}", spec.name, step),
        ));
    }
    Ok(u32::try_from(step).unwrap_or(u32::MAX))
}

// ============================================================================
// Calendar arithmetic
// ============================================================================

/// Calendar position of the search, always in UTC.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

impl Cursor {
    /// Push minute and hour overflow into the next unit. Day overflow is
    /// handled by the search loop since it depends on the month length.
    fn carry(&mut self) {
        if self.minute >= 60 {
            self.minute = 0;
            self.hour += 1;
        }
        if self.hour >= 24 {
            self.hour = 0;
            self.day += 1;
        }
    }

    fn next_hour(&mut self) {
        self.hour += 1;
        self.minute = 0;
        self.carry();
    }

    fn next_day(&mut self) {
        self.day += 1;
        self.hour = 0;
        self.minute = 0;
    }

    fn next_month(&mut self) {
        self.month += 1;
        if self.month > 12 {
            self.month = 1;
            self.year += 1;
        }
        self.day = 1;
        self.hour = 0;
        self.minute = 0;
    }

    /// The cursor's calendar date, or `None` when the day lies past the
    /// end of the month (or the year is outside jiff's range).
    fn date(self) -> Option<civil::Date> {
        civil::Date::new(
            i16::try_from(self.year).ok()?,
            self.month as i8,
            i8::try_from(self.day).ok()?,
        )
        .ok()
    }

    fn to_timestamp(self) -> Option<Timestamp> {
        let dt = civil::DateTime::new(
            i16::try_from(self.year).ok()?,
            self.month as i8,
            self.day as i8,
            self.hour as i8,
            self.minute as i8,
            0,
            0,
        )
        .ok()?;
        dt.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp())
    }
}
