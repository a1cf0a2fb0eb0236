//! Adherence configuration.
//!
//! # Responsibility
//! - Hold the tolerance and recency windows passed into the calculator.
//! - Hold the documented default zone used when a caller sends none.
//!
//! # Invariants
//! - Windows are never negative.
//! - Configuration is passed explicitly; there is no process-wide copy.

use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::schedule::parse_time_zone;

/// Default grace period around a nominal due instant.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 30;
/// Default period after an intake during which it counts as "just taken".
pub const DEFAULT_RECENT_MINUTES: i64 = 120;
/// Zone used when neither the schedule nor the caller names one.
pub const DEFAULT_TIME_ZONE: Tz = Tz::UTC;

/// Validated calculator/service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdherenceConfig {
    pub tolerance_window: Duration,
    pub recent_window: Duration,
    /// Fallback zone for reads without a caller zone. Only consulted at the
    /// service boundary, never inside the pure calculator.
    pub default_time_zone: Tz,
}

impl Default for AdherenceConfig {
    fn default() -> Self {
        Self {
            tolerance_window: Duration::minutes(DEFAULT_TOLERANCE_MINUTES),
            recent_window: Duration::minutes(DEFAULT_RECENT_MINUTES),
            default_time_zone: DEFAULT_TIME_ZONE,
        }
    }
}

impl AdherenceConfig {
    pub fn with_tolerance_window(mut self, window: Duration) -> Result<Self, ConfigError> {
        if window < Duration::zero() {
            return Err(ConfigError::NegativeWindow("tolerance_window"));
        }
        self.tolerance_window = window;
        Ok(self)
    }

    pub fn with_recent_window(mut self, window: Duration) -> Result<Self, ConfigError> {
        if window < Duration::zero() {
            return Err(ConfigError::NegativeWindow("recent_window"));
        }
        self.recent_window = window;
        Ok(self)
    }

    pub fn with_default_time_zone(mut self, zone: Tz) -> Self {
        self.default_time_zone = zone;
        self
    }
}

/// Serialized configuration source, e.g. from a host app settings file.
///
/// Missing fields take the crate defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdherenceSettings {
    pub tolerance_minutes: Option<i64>,
    pub recent_minutes: Option<i64>,
    pub default_time_zone: Option<String>,
}

impl TryFrom<AdherenceSettings> for AdherenceConfig {
    type Error = ConfigError;

    fn try_from(value: AdherenceSettings) -> Result<Self, Self::Error> {
        let mut config = AdherenceConfig::default();
        if let Some(minutes) = value.tolerance_minutes {
            config = config.with_tolerance_window(window_minutes(minutes, "tolerance_window")?)?;
        }
        if let Some(minutes) = value.recent_minutes {
            config = config.with_recent_window(window_minutes(minutes, "recent_window")?)?;
        }
        if let Some(name) = value.default_time_zone.as_deref() {
            let zone =
                parse_time_zone(name).map_err(|_| ConfigError::InvalidTimeZone(name.to_string()))?;
            config = config.with_default_time_zone(zone);
        }
        Ok(config)
    }
}

fn window_minutes(minutes: i64, field: &'static str) -> Result<Duration, ConfigError> {
    Duration::try_minutes(minutes).ok_or(ConfigError::WindowOutOfRange(field))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NegativeWindow(&'static str),
    WindowOutOfRange(&'static str),
    InvalidTimeZone(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeWindow(field) => write!(f, "{field} must not be negative"),
            Self::WindowOutOfRange(field) => write!(f, "{field} is out of range"),
            Self::InvalidTimeZone(name) => write!(f, "unknown default time zone `{name}`"),
        }
    }
}

impl Error for ConfigError {}
