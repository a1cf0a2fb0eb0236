//! Medication schedule model.
//!
//! # Responsibility
//! - Define the two cadence shapes a medication can follow.
//! - Parse untyped schedule source records into a validated `Schedule`.
//!
//! # Invariants
//! - `Schedule::Interval` always carries `every_hours > 0`.
//! - `TimeOfDay` always carries `hour <= 23` and `minute <= 59`.
//! - Malformed inputs are rejected here, never at calculation time.

use chrono::NaiveTime;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static TIME_OF_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid time-of-day regex"));

/// Time of day used when a daily schedule has no explicit time.
pub const DEFAULT_DAILY_TIME: TimeOfDay = TimeOfDay { hour: 9, minute: 0 };

/// Validation failures for schedule construction and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Interval hour count is zero or negative.
    NonPositiveInterval(i64),
    /// Interval hour count does not fit the supported range.
    IntervalTooLarge(i64),
    /// Time string is not `HH:MM` within 00:00..=23:59.
    InvalidTimeOfDay(String),
    /// Source record names a schedule type this crate does not know.
    UnknownScheduleType(String),
    /// Zone name is not a known IANA time zone.
    InvalidTimeZone(String),
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveInterval(hours) => {
                write!(f, "interval hours must be positive, got {hours}")
            }
            Self::IntervalTooLarge(hours) => {
                write!(f, "interval hours must be at most {}, got {hours}", u32::MAX)
            }
            Self::InvalidTimeOfDay(value) => {
                write!(f, "time of day must be HH:MM, got `{value}`")
            }
            Self::UnknownScheduleType(value) => write!(f, "unknown schedule type `{value}`"),
            Self::InvalidTimeZone(value) => write!(f, "unknown time zone `{value}`"),
        }
    }
}

impl Error for ScheduleError {}

/// Wall-clock time of day with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Parses a strict `H:MM` / `HH:MM` string.
    ///
    /// Surrounding whitespace is ignored. Seconds, am/pm markers and
    /// out-of-range components are rejected.
    pub fn parse(value: &str) -> Result<Self, ScheduleError> {
        let trimmed = value.trim();
        let caps = TIME_OF_DAY_RE
            .captures(trimmed)
            .ok_or_else(|| ScheduleError::InvalidTimeOfDay(value.to_string()))?;
        let hour = caps[1]
            .parse::<u8>()
            .map_err(|_| ScheduleError::InvalidTimeOfDay(value.to_string()))?;
        let minute = caps[2]
            .parse::<u8>()
            .map_err(|_| ScheduleError::InvalidTimeOfDay(value.to_string()))?;
        Self::new(hour, minute).map_err(|_| ScheduleError::InvalidTimeOfDay(value.to_string()))
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Range is guaranteed by construction.
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or_default()
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Declarative cadence for one medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Take again `every_hours` after the last dose.
    Interval { every_hours: u32 },
    /// Take once per calendar day at a fixed local time.
    Daily { at: TimeOfDay },
}

impl Schedule {
    /// Builds an interval schedule, rejecting non-positive hour counts.
    pub fn every_hours(hours: i64) -> Result<Self, ScheduleError> {
        if hours <= 0 {
            return Err(ScheduleError::NonPositiveInterval(hours));
        }
        let every_hours =
            u32::try_from(hours).map_err(|_| ScheduleError::IntervalTooLarge(hours))?;
        Ok(Self::Interval { every_hours })
    }

    pub fn daily_at(at: TimeOfDay) -> Self {
        Self::Daily { at }
    }
}

/// Untyped schedule source row as supplied by a schedule store.
///
/// Every field is optional because upstream records are loosely shaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    /// Optional type tag: `interval` or `daily`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub interval_hours: Option<i64>,
    /// `HH:MM` local time for daily schedules.
    pub time_of_day: Option<String>,
    /// Explicit IANA zone overriding the caller's zone.
    pub time_zone: Option<String>,
}

/// Validated schedule plus its optional explicit zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleDefinition {
    pub schedule: Schedule,
    pub time_zone: Option<Tz>,
}

impl ScheduleRecord {
    /// Resolves this record into a validated schedule definition.
    ///
    /// # Contract
    /// - Tag `interval` requires a positive `interval_hours`.
    /// - Tag `daily` uses `time_of_day`, defaulting to 09:00.
    /// - Without a tag, a positive `interval_hours` selects `Interval`;
    ///   anything else falls back to `Daily`.
    /// - Malformed `time_of_day` or `time_zone` values are errors.
    pub fn resolve(&self) -> Result<ScheduleDefinition, ScheduleError> {
        let time_zone = match self.time_zone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(parse_time_zone(name)?),
        };

        let kind = self
            .kind
            .as_deref()
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());

        let schedule = match kind.as_deref() {
            Some("interval") => Schedule::every_hours(self.interval_hours.unwrap_or(0))?,
            Some("daily") => Schedule::daily_at(self.daily_time()?),
            Some(other) => return Err(ScheduleError::UnknownScheduleType(other.to_string())),
            None => match self.interval_hours {
                Some(hours) if hours > 0 => Schedule::every_hours(hours)?,
                _ => Schedule::daily_at(self.daily_time()?),
            },
        };

        Ok(ScheduleDefinition {
            schedule,
            time_zone,
        })
    }

    fn daily_time(&self) -> Result<TimeOfDay, ScheduleError> {
        match self.time_of_day.as_deref() {
            None => Ok(DEFAULT_DAILY_TIME),
            Some(value) if value.trim().is_empty() => Ok(DEFAULT_DAILY_TIME),
            Some(value) => TimeOfDay::parse(value),
        }
    }
}

/// Parses an IANA zone name such as `Europe/Berlin`.
pub fn parse_time_zone(name: &str) -> Result<Tz, ScheduleError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimeZone(name.to_string()))
}
