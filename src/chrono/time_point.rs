//! Points in time on one of the two clock domains.

use super::{Calibration, ClockType, Duration, TimeUnit};
use crate::core::{Result, StatsError};
use ::chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Duration since the epoch of `clock`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePoint {
    since_epoch: Duration,
    clock: ClockType,
}

impl TimePoint {
    pub const fn new(since_epoch: Duration, clock: ClockType) -> Self {
        Self { since_epoch, clock }
    }

    /// Offset from the clock's epoch
    pub fn time_since_epoch(&self) -> Duration {
        self.since_epoch
    }

    /// Clock domain this point belongs to
    pub fn clock(&self) -> ClockType {
        self.clock
    }

    /// Move `t` onto `clock` using the installed calibration.
    pub fn convert_to(clock: ClockType, t: TimePoint) -> Result<TimePoint> {
        if t.clock == clock {
            return Ok(t);
        }
        let calibration = Calibration::get().ok_or_else(|| {
            StatsError::usage(format!(
                "converting a {} time point to the {} clock needs an installed calibration",
                t.clock, clock
            ))
        })?;
        Ok(Self::convert_with(clock, t, calibration))
    }

    /// Move `t` onto `clock` using an explicit calibration.
    ///
    /// Internal points come back in `Nsec` on the system clock, system
    /// points come back in `Cycle` on the internal clock.
    pub fn convert_with(clock: ClockType, t: TimePoint, calibration: &Calibration) -> TimePoint {
        match (t.clock, clock) {
            (ClockType::Internal, ClockType::System) => {
                let nanos = Duration::convert_with(TimeUnit::Nsec, t.since_epoch, calibration);
                TimePoint::new(
                    Duration::from_nanos(nanos.count().saturating_add(calibration.system_offset_ns())),
                    ClockType::System,
                )
            },
            (ClockType::System, ClockType::Internal) => {
                let nanos = Duration::convert_with(TimeUnit::Nsec, t.since_epoch, calibration);
                let local = Duration::from_nanos(
                    nanos.count().saturating_sub(calibration.system_offset_ns()),
                );
                TimePoint::new(
                    Duration::convert_with(TimeUnit::Cycle, local, calibration),
                    ClockType::Internal,
                )
            },
            _ => t,
        }
    }

    /// `self - earlier`, refusing points from different clocks
    pub fn checked_duration_since(&self, earlier: &TimePoint) -> Result<Duration> {
        self.require_same_clock(earlier)?;
        self.since_epoch.checked_sub(earlier.since_epoch)
    }

    /// Shift by `d`
    pub fn checked_add(&self, d: Duration) -> Result<TimePoint> {
        Ok(TimePoint::new(self.since_epoch.checked_add(d)?, self.clock))
    }

    /// Shift back by `d`
    pub fn checked_sub(&self, d: Duration) -> Result<TimePoint> {
        Ok(TimePoint::new(self.since_epoch.checked_sub(d)?, self.clock))
    }

    /// Compare two points of the same clock
    pub fn try_cmp(&self, other: &TimePoint) -> Result<Ordering> {
        self.require_same_clock(other)?;
        self.since_epoch.try_cmp(&other.since_epoch)
    }

    /// Wall-clock rendering of a system time point
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if self.clock != ClockType::System {
            return None;
        }
        let nanos = Duration::convert_to(TimeUnit::Nsec, self.since_epoch).ok()?;
        let secs = nanos.count().div_euclid(1_000_000_000);
        let subsec = u32::try_from(nanos.count().rem_euclid(1_000_000_000)).ok()?;
        DateTime::<Utc>::from_timestamp(secs, subsec)
    }

    fn require_same_clock(&self, other: &TimePoint) -> Result<()> {
        if self.clock != other.clock {
            return Err(StatsError::usage(format!(
                "time points from the {} and {} clocks cannot be combined without conversion",
                self.clock, other.clock
            )));
        }
        Ok(())
    }
}

impl Default for TimePoint {
    fn default() -> Self {
        Self::new(Duration::new(0, TimeUnit::Cycle), ClockType::Internal)
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.try_cmp(other), Ok(Ordering::Equal))
    }
}

/// Points from different clocks are unordered.
impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl Add<Duration> for TimePoint {
    type Output = TimePoint;

    fn add(self, rhs: Duration) -> TimePoint {
        TimePoint::new(self.since_epoch + rhs, self.clock)
    }
}

impl Sub<Duration> for TimePoint {
    type Output = TimePoint;

    fn sub(self, rhs: Duration) -> TimePoint {
        TimePoint::new(self.since_epoch - rhs, self.clock)
    }
}

impl AddAssign<Duration> for TimePoint {
    fn add_assign(&mut self, rhs: Duration) {
        self.since_epoch += rhs;
    }
}

impl SubAssign<Duration> for TimePoint {
    fn sub_assign(&mut self, rhs: Duration) {
        self.since_epoch -= rhs;
    }
}

/// Panics when the clocks differ; use [`TimePoint::checked_duration_since`]
/// to handle that case.
impl Sub for TimePoint {
    type Output = Duration;

    fn sub(self, rhs: TimePoint) -> Duration {
        match self.checked_duration_since(&rhs) {
            Ok(d) => d,
            Err(e) => panic!("{}", e),
        }
    }
}
