//! Clock sources and the one-time calibration that relates them.
//!
//! The internal clock reads the CPU timestamp counter through `quanta`
//! and reports raw cycles. Turning cycles into wall time needs the
//! counter frequency and the offset between the two epochs; both are
//! captured once in a [`Calibration`] and never change afterwards.

use super::{ClockType, Duration, TimePoint, TimeUnit};
use crate::core::{Result, StatsError};
use once_cell::sync::{Lazy, OnceCell};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Number of raw cycles used to derive the counter frequency
const CALIBRATION_SPAN: u64 = 1 << 32;

static TSC: Lazy<quanta::Clock> = Lazy::new(quanta::Clock::new);

static INSTALLED: OnceCell<Calibration> = OnceCell::new();

/// Monotonic clock with an arbitrary epoch, cheap enough for every call site.
pub struct InternalClock;

impl InternalClock {
    /// Current time in `Cycle` units on the `Internal` clock
    #[inline(always)]
    pub fn now() -> TimePoint {
        let raw = i64::try_from(TSC.raw()).unwrap_or(i64::MAX);
        TimePoint::new(Duration::new(raw, TimeUnit::Cycle), ClockType::Internal)
    }
}

/// Wall clock with the Unix epoch, for human-facing timestamps.
pub struct SystemClock;

impl SystemClock {
    /// Current time in `Nsec` units on the `System` clock
    pub fn now() -> TimePoint {
        let nanos = ::chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        TimePoint::new(Duration::new(nanos, TimeUnit::Nsec), ClockType::System)
    }
}

/// Relation between the internal cycle counter and the system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    cycles_per_sec: i64,
    /// System nanoseconds at internal cycle zero
    system_offset_ns: i64,
}

impl Calibration {
    /// Build a calibration from known values. The frequency must be positive.
    pub fn new(cycles_per_sec: i64, system_offset_ns: i64) -> Result<Self> {
        let calibration = Self {
            cycles_per_sec,
            system_offset_ns,
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Measure the counter frequency and epoch offset of this machine.
    pub fn measure() -> Result<Self> {
        let span = TSC.delta(0, CALIBRATION_SPAN);
        let span_nanos = span.as_nanos();
        if span_nanos == 0 {
            return Err(StatsError::calibration(
                "internal clock reported a zero-length calibration span",
            ));
        }

        let cycles_per_sec = (i128::from(CALIBRATION_SPAN) * NANOS_PER_SEC) / span_nanos as i128;
        let cycles_per_sec = i64::try_from(cycles_per_sec)
            .map_err(|_| StatsError::calibration("internal clock frequency out of range"))?;

        let before = TSC.raw();
        let system = SystemClock::now().time_since_epoch().count();
        let after = TSC.raw();
        let mid = i64::try_from(before / 2 + after / 2).unwrap_or(i64::MAX);

        let mut calibration = Self::new(cycles_per_sec, 0)?;
        calibration.system_offset_ns = system.saturating_sub(calibration.cycles_to_nanos(mid));

        tracing::debug!(
            cycles_per_sec = calibration.cycles_per_sec,
            system_offset_ns = calibration.system_offset_ns,
            "Measured clock calibration"
        );
        Ok(calibration)
    }

    /// Reject calibrations that would make conversions meaningless
    pub fn validate(&self) -> Result<()> {
        if self.cycles_per_sec <= 0 {
            return Err(StatsError::calibration(format!(
                "cycles_per_sec must be positive, got {}",
                self.cycles_per_sec
            )));
        }
        Ok(())
    }

    /// Install the process-wide calibration.
    ///
    /// Succeeds once. A repeated install with identical values is a no-op;
    /// a different value is rejected so the installed relation never changes.
    pub fn install(calibration: Calibration) -> Result<&'static Calibration> {
        calibration.validate()?;
        let installed = INSTALLED.get_or_init(|| calibration);
        if *installed != calibration {
            return Err(StatsError::config(
                "clock calibration is already installed with different values",
            ));
        }
        Ok(installed)
    }

    /// Install a freshly measured calibration unless one already exists
    pub fn ensure_installed() -> Result<&'static Calibration> {
        INSTALLED.get_or_try_init(Self::measure)
    }

    /// The installed calibration, if any
    pub fn get() -> Option<&'static Calibration> {
        INSTALLED.get()
    }

    /// Internal clock ticks per second
    pub fn cycles_per_sec(&self) -> i64 {
        self.cycles_per_sec
    }

    /// System nanoseconds at internal cycle zero
    pub fn system_offset_ns(&self) -> i64 {
        self.system_offset_ns
    }

    /// Cycles to nanoseconds, truncating toward zero
    pub fn cycles_to_nanos(&self, cycles: i64) -> i64 {
        saturate(i128::from(cycles) * NANOS_PER_SEC / i128::from(self.cycles_per_sec))
    }

    /// Nanoseconds to cycles, truncating toward zero
    pub fn nanos_to_cycles(&self, nanos: i64) -> i64 {
        saturate(i128::from(nanos) * i128::from(self.cycles_per_sec) / NANOS_PER_SEC)
    }
}

#[inline]
pub(crate) fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_frequency_rejected() {
        assert!(Calibration::new(0, 0).is_err());
        assert!(Calibration::new(-5, 0).is_err());
        assert!(Calibration::new(1_000, 0).is_ok());
    }

    #[test]
    fn test_cycle_nanos_conversion() {
        let cal = Calibration::new(2_000_000_000, 0).unwrap();
        assert_eq!(cal.cycles_to_nanos(4_000), 2_000);
        assert_eq!(cal.nanos_to_cycles(2_000), 4_000);
        // truncation toward zero
        assert_eq!(cal.cycles_to_nanos(3), 1);
        assert_eq!(cal.cycles_to_nanos(-3), -1);
    }

    #[test]
    fn test_measured_calibration_is_valid() {
        let cal = Calibration::measure().unwrap();
        assert!(cal.cycles_per_sec() > 0);
        assert!(cal.validate().is_ok());
    }

    #[test]
    fn test_internal_clock_is_monotonic() {
        let first = InternalClock::now();
        let second = InternalClock::now();
        assert_eq!(first.clock(), ClockType::Internal);
        assert_eq!(first.time_since_epoch().unit(), TimeUnit::Cycle);
        assert!(second.time_since_epoch().count() >= first.time_since_epoch().count());
    }

    #[test]
    fn test_system_clock_uses_unix_epoch() {
        let now = SystemClock::now();
        assert_eq!(now.clock(), ClockType::System);
        // after 2020-01-01
        assert!(now.time_since_epoch().count() > 1_577_836_800_000_000_000);
    }
}
