//! Time units and clock domains.

use crate::core::{Result, StatsError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Unit a [`Duration`](super::Duration) tick count is expressed in.
///
/// Variants are declared from finest to coarsest, so the derived `Ord`
/// is the precision class: `a < b` means `a` is finer than `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    /// Internal clock ticks; scale depends on the calibrated frequency
    Cycle,
    Nsec,
    Usec,
    Msec,
    Sec,
    Min,
    Hour,
    Day,
}

impl TimeUnit {
    /// Every unit, finest first
    pub const ALL: [TimeUnit; 8] = [
        TimeUnit::Cycle,
        TimeUnit::Nsec,
        TimeUnit::Usec,
        TimeUnit::Msec,
        TimeUnit::Sec,
        TimeUnit::Min,
        TimeUnit::Hour,
        TimeUnit::Day,
    ];

    /// Short name used in configuration and display
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Cycle => "c",
            TimeUnit::Nsec => "ns",
            TimeUnit::Usec => "us",
            TimeUnit::Msec => "ms",
            TimeUnit::Sec => "s",
            TimeUnit::Min => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
        }
    }

    /// Nanoseconds in one tick of this unit. `None` for `Cycle`, whose
    /// length is only known after calibration.
    pub const fn nanos_per_tick(&self) -> Option<i64> {
        match self {
            TimeUnit::Cycle => None,
            TimeUnit::Nsec => Some(1),
            TimeUnit::Usec => Some(1_000),
            TimeUnit::Msec => Some(1_000_000),
            TimeUnit::Sec => Some(1_000_000_000),
            TimeUnit::Min => Some(60 * 1_000_000_000),
            TimeUnit::Hour => Some(3_600 * 1_000_000_000),
            TimeUnit::Day => Some(86_400 * 1_000_000_000),
        }
    }

    /// The finer of two units
    #[inline]
    pub fn finer(self, other: TimeUnit) -> TimeUnit {
        self.min(other)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| StatsError::config(format!("unknown time unit '{}'", s)))
    }
}

impl Serialize for TimeUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TimeUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Clock domain a [`TimePoint`](super::TimePoint) was sampled from.
///
/// The domains have unrelated epochs and are never compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockType {
    /// Monotonic, arbitrary epoch, cheap to sample
    Internal,
    /// Wall clock, Unix epoch
    System,
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockType::Internal => f.write_str("internal"),
            ClockType::System => f.write_str("system"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_ordering() {
        assert!(TimeUnit::Cycle < TimeUnit::Nsec);
        assert!(TimeUnit::Msec < TimeUnit::Sec);
        assert!(TimeUnit::Hour < TimeUnit::Day);
        assert_eq!(TimeUnit::Sec.finer(TimeUnit::Usec), TimeUnit::Usec);
        assert_eq!(TimeUnit::Cycle.finer(TimeUnit::Day), TimeUnit::Cycle);
    }

    #[test]
    fn test_unit_string_round_trip() {
        for unit in TimeUnit::ALL {
            assert_eq!(unit.as_str().parse::<TimeUnit>().unwrap(), unit);
        }
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let err = "weeks".parse::<TimeUnit>().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_fixed_ratios() {
        assert_eq!(TimeUnit::Usec.nanos_per_tick(), Some(1_000));
        assert_eq!(TimeUnit::Min.nanos_per_tick(), Some(60_000_000_000));
        assert_eq!(TimeUnit::Day.nanos_per_tick(), Some(86_400_000_000_000));
        assert_eq!(TimeUnit::Cycle.nanos_per_tick(), None);
    }
}
