//! Signed, unit-tagged durations.
//!
//! Two durations in different units are brought to the finer unit before
//! any arithmetic or comparison. Between calibrated units the ratios are
//! fixed; anything involving `Cycle` needs the installed [`Calibration`].
//! When that conversion is impossible the `checked_*` and `try_*`
//! methods return [`StatsError::Usage`], `partial_cmp` returns `None`,
//! and the std operators panic.

use super::clock::saturate;
use super::{Calibration, TimeUnit};
use crate::core::{Result, StatsError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

/// Tick count plus the unit those ticks are measured in
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Duration {
    count: i64,
    unit: TimeUnit,
}

impl Duration {
    /// Create a duration of `count` ticks of `unit`
    pub const fn new(count: i64, unit: TimeUnit) -> Self {
        Self { count, unit }
    }

    /// Zero nanoseconds
    pub const fn zero() -> Self {
        Self::new(0, TimeUnit::Nsec)
    }

    pub const fn from_nanos(nanos: i64) -> Self {
        Self::new(nanos, TimeUnit::Nsec)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self::new(micros, TimeUnit::Usec)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self::new(millis, TimeUnit::Msec)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self::new(secs, TimeUnit::Sec)
    }

    /// Raw tick count
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Unit of the tick count
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Rescale `d` to `unit` using the installed calibration for `Cycle`.
    ///
    /// Truncates toward zero; moving to a coarser unit drops the
    /// sub-unit remainder.
    pub fn convert_to(unit: TimeUnit, d: Duration) -> Result<Duration> {
        rescale(d.count, d.unit, unit, Calibration::get()).map(|count| Duration::new(count, unit))
    }

    /// Rescale `d` to `unit` using an explicit calibration
    pub fn convert_with(unit: TimeUnit, d: Duration, calibration: &Calibration) -> Duration {
        // with a calibration at hand every pair of units is convertible
        let count = rescale(d.count, d.unit, unit, Some(calibration)).unwrap_or(0);
        Duration::new(count, unit)
    }

    /// Shorthand for [`Duration::convert_to`]
    pub fn to_unit(self, unit: TimeUnit) -> Result<Duration> {
        Self::convert_to(unit, self)
    }

    /// Value in `unit` as a float, keeping the sub-unit fraction
    pub fn as_f64(&self, unit: TimeUnit) -> Result<f64> {
        if self.unit == unit {
            return Ok(self.count as f64);
        }
        let calibration = Calibration::get();
        let nanos = match self.unit.nanos_per_tick() {
            Some(scale) => self.count as f64 * scale as f64,
            None => {
                let cal = calibration.ok_or_else(|| missing_calibration(self.unit, unit))?;
                self.count as f64 * 1e9 / cal.cycles_per_sec() as f64
            },
        };
        match unit.nanos_per_tick() {
            Some(scale) => Ok(nanos / scale as f64),
            None => {
                let cal = calibration.ok_or_else(|| missing_calibration(self.unit, unit))?;
                Ok(nanos * cal.cycles_per_sec() as f64 / 1e9)
            },
        }
    }

    /// Seconds as a float
    pub fn as_secs_f64(&self) -> Result<f64> {
        self.as_f64(TimeUnit::Sec)
    }

    /// Absolute value, same unit
    pub fn abs(self) -> Self {
        Self::new(self.count.saturating_abs(), self.unit)
    }

    /// True when the tick count is zero
    pub fn is_zero(&self) -> bool {
        self.count == 0
    }

    /// Sum in the finer of the two units
    pub fn checked_add(self, rhs: Duration) -> Result<Duration> {
        let (lhs, rhs, unit) = self.common(rhs)?;
        Ok(Duration::new(lhs.saturating_add(rhs), unit))
    }

    /// Difference in the finer of the two units
    pub fn checked_sub(self, rhs: Duration) -> Result<Duration> {
        let (lhs, rhs, unit) = self.common(rhs)?;
        Ok(Duration::new(lhs.saturating_sub(rhs), unit))
    }

    /// Compare in the finer of the two units
    pub fn try_cmp(&self, other: &Duration) -> Result<Ordering> {
        let (lhs, rhs, _) = self.common(*other)?;
        Ok(lhs.cmp(&rhs))
    }

    fn common(self, other: Duration) -> Result<(i64, i64, TimeUnit)> {
        if self.unit == other.unit {
            return Ok((self.count, other.count, self.unit));
        }
        let unit = self.unit.finer(other.unit);
        let calibration = Calibration::get();
        let lhs = rescale(self.count, self.unit, unit, calibration)?;
        let rhs = rescale(other.count, other.unit, unit, calibration)?;
        Ok((lhs, rhs, unit))
    }
}

fn rescale(
    count: i64,
    from: TimeUnit,
    to: TimeUnit,
    calibration: Option<&Calibration>,
) -> Result<i64> {
    if from == to {
        return Ok(count);
    }
    match (from.nanos_per_tick(), to.nanos_per_tick()) {
        (Some(from_ns), Some(to_ns)) => {
            Ok(saturate(i128::from(count) * i128::from(from_ns) / i128::from(to_ns)))
        },
        (None, Some(to_ns)) => {
            let cal = calibration.ok_or_else(|| missing_calibration(from, to))?;
            Ok(cal.cycles_to_nanos(count) / to_ns)
        },
        (Some(from_ns), None) => {
            let cal = calibration.ok_or_else(|| missing_calibration(from, to))?;
            let nanos = saturate(i128::from(count) * i128::from(from_ns));
            Ok(cal.nanos_to_cycles(nanos))
        },
        (None, None) => Ok(count),
    }
}

fn missing_calibration(from: TimeUnit, to: TimeUnit) -> StatsError {
    StatsError::usage(format!(
        "converting {} to {} needs an installed clock calibration",
        from, to
    ))
}

fn expect_usage<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}", e),
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit)
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self::from_nanos(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.try_cmp(other), Ok(Ordering::Equal))
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration::new(self.count.saturating_neg(), self.unit)
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        expect_usage(self.checked_add(rhs))
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        expect_usage(self.checked_sub(rhs))
    }
}

impl Rem for Duration {
    type Output = Duration;

    fn rem(self, rhs: Duration) -> Duration {
        let (lhs, rhs, unit) = expect_usage(self.common(rhs));
        Duration::new(lhs % rhs, unit)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl RemAssign for Duration {
    fn rem_assign(&mut self, rhs: Duration) {
        *self = *self % rhs;
    }
}

// Integer operands act on the tick count and keep the unit.

impl Add<i64> for Duration {
    type Output = Duration;

    fn add(self, rhs: i64) -> Duration {
        Duration::new(self.count.saturating_add(rhs), self.unit)
    }
}

impl Sub<i64> for Duration {
    type Output = Duration;

    fn sub(self, rhs: i64) -> Duration {
        Duration::new(self.count.saturating_sub(rhs), self.unit)
    }
}

impl Mul<i64> for Duration {
    type Output = Duration;

    fn mul(self, rhs: i64) -> Duration {
        Duration::new(self.count.saturating_mul(rhs), self.unit)
    }
}

impl Div<i64> for Duration {
    type Output = Duration;

    fn div(self, rhs: i64) -> Duration {
        Duration::new(self.count / rhs, self.unit)
    }
}

impl Rem<i64> for Duration {
    type Output = Duration;

    fn rem(self, rhs: i64) -> Duration {
        Duration::new(self.count % rhs, self.unit)
    }
}

impl AddAssign<i64> for Duration {
    fn add_assign(&mut self, rhs: i64) {
        self.count = self.count.saturating_add(rhs);
    }
}

impl SubAssign<i64> for Duration {
    fn sub_assign(&mut self, rhs: i64) {
        self.count = self.count.saturating_sub(rhs);
    }
}

impl MulAssign<i64> for Duration {
    fn mul_assign(&mut self, rhs: i64) {
        self.count = self.count.saturating_mul(rhs);
    }
}

impl DivAssign<i64> for Duration {
    fn div_assign(&mut self, rhs: i64) {
        self.count /= rhs;
    }
}

impl RemAssign<i64> for Duration {
    fn rem_assign(&mut self, rhs: i64) {
        self.count %= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_to_coarser_truncates() {
        let d = Duration::new(1_999, TimeUnit::Usec);
        let ms = Duration::convert_to(TimeUnit::Msec, d).unwrap();
        assert_eq!(ms.count(), 1);
        assert_eq!(ms.unit(), TimeUnit::Msec);

        let negative = Duration::convert_to(TimeUnit::Msec, Duration::new(-1_999, TimeUnit::Usec))
            .unwrap();
        assert_eq!(negative.count(), -1);
    }

    #[test]
    fn test_convert_to_finer_is_exact() {
        let d = Duration::new(3, TimeUnit::Hour);
        assert_eq!(Duration::convert_to(TimeUnit::Min, d).unwrap().count(), 180);
        assert_eq!(Duration::convert_to(TimeUnit::Sec, d).unwrap().count(), 10_800);
        let day = Duration::new(1, TimeUnit::Day);
        assert_eq!(
            Duration::convert_to(TimeUnit::Nsec, day).unwrap().count(),
            86_400_000_000_000
        );
    }

    #[test]
    fn test_cycle_conversion_with_explicit_calibration() {
        let cal = Calibration::new(3_000_000_000, 0).unwrap();
        let cycles = Duration::new(3_000, TimeUnit::Cycle);
        let ns = Duration::convert_with(TimeUnit::Nsec, cycles, &cal);
        assert_eq!(ns.count(), 1_000);

        let back = Duration::convert_with(TimeUnit::Cycle, Duration::from_micros(2), &cal);
        assert_eq!(back.count(), 6_000);
    }

    #[test]
    fn test_mixed_unit_arithmetic_uses_finer_unit() {
        let sum = Duration::from_secs(1) + Duration::from_millis(250);
        assert_eq!(sum.unit(), TimeUnit::Msec);
        assert_eq!(sum.count(), 1_250);

        let diff = Duration::from_millis(5) - Duration::from_micros(1_500);
        assert_eq!(diff.unit(), TimeUnit::Usec);
        assert_eq!(diff.count(), 3_500);
    }

    #[test]
    fn test_cross_unit_comparison() {
        assert_eq!(Duration::from_secs(1), Duration::from_millis(1_000));
        assert!(Duration::from_millis(999) < Duration::from_secs(1));
        assert!(Duration::new(2, TimeUnit::Min) > Duration::from_secs(119));
        assert_ne!(Duration::from_micros(1_001), Duration::from_millis(1));
    }

    #[test]
    fn test_integer_operands_scale_ticks() {
        let mut d = Duration::from_millis(10);
        d += 5;
        assert_eq!(d.count(), 15);
        d *= 4;
        assert_eq!(d.count(), 60);
        d /= 7;
        assert_eq!(d.count(), 8);
        d %= 3;
        assert_eq!(d.count(), 2);
        d -= 10;
        assert_eq!(d.count(), -8);
        assert_eq!(d.unit(), TimeUnit::Msec);
        assert_eq!((-d).count(), 8);
    }

    #[test]
    fn test_duration_remainder() {
        let rem = Duration::from_millis(2_500) % Duration::from_secs(1);
        assert_eq!(rem.count(), 500);
        assert_eq!(rem.unit(), TimeUnit::Msec);
    }

    #[test]
    fn test_fractional_value() {
        let d = Duration::from_micros(1_500);
        assert_eq!(d.as_f64(TimeUnit::Msec).unwrap(), 1.5);
        assert_eq!(Duration::from_millis(250).as_secs_f64().unwrap(), 0.25);
    }

    #[test]
    fn test_display_and_std_conversion() {
        assert_eq!(Duration::from_millis(42).to_string(), "42ms");
        let d: Duration = std::time::Duration::from_micros(7).into();
        assert_eq!(d.count(), 7_000);
        assert_eq!(d.unit(), TimeUnit::Nsec);
    }
}
