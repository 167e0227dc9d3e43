//! Time update intervals selectable on the command line or in the config.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How often the time part of the status line changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    Second,
    #[default]
    Minute,
    Hour,
    /// Shows the date only.  Still ticks hourly so a date change is
    /// picked up within the hour.
    Day,
}

/// Longest period the ticker ever sleeps.
const MAX_TICK: Duration = Duration::from_secs(60 * 60);

impl Interval {
    /// Period of the ticker, clamped to one hour.
    pub fn tick(self) -> Duration {
        let full = match self {
            Interval::Second => Duration::from_secs(1),
            Interval::Minute => Duration::from_secs(60),
            Interval::Hour => Duration::from_secs(60 * 60),
            Interval::Day => Duration::from_secs(24 * 60 * 60),
        };
        full.min(MAX_TICK)
    }

    /// Time format used when none is given.
    pub fn default_format(self) -> &'static str {
        match self {
            Interval::Second => "%Y-%m-%d %H:%M:%S",
            Interval::Minute => "%Y-%m-%d %H:%M",
            Interval::Hour => "%Y-%m-%d %Hh",
            Interval::Day => "%Y-%m-%d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Second => write!(f, "second"),
            Interval::Minute => write!(f, "minute"),
            Interval::Hour => write!(f, "hour"),
            Interval::Day => write!(f, "day"),
        }
    }
}

/// The string names no known interval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interval: {0:?} (expected s|second, m|minute, h|hour or d|day)")]
pub struct ParseIntervalError(String);

impl FromStr for Interval {
    type Err = ParseIntervalError;

    /// Case-insensitive; accepts the full name or its first letter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "second" => Ok(Interval::Second),
            "m" | "minute" => Ok(Interval::Minute),
            "h" | "hour" => Ok(Interval::Hour),
            "d" | "day" => Ok(Interval::Day),
            _ => Err(ParseIntervalError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
