//! Dual-domain time representation.
//!
//! - [`InternalClock`]: raw CPU cycles, monotonic, cheap enough for hot paths
//! - [`SystemClock`]: nanoseconds since the Unix epoch, for human-facing stamps
//!
//! [`Duration`] and [`TimePoint`] carry their unit and clock with them, so
//! mixing domains without a conversion is caught instead of producing a
//! silently wrong number.

pub mod clock;
pub mod duration;
pub mod time_point;
pub mod unit;

pub use clock::{Calibration, InternalClock, SystemClock};
pub use duration::Duration;
pub use time_point::TimePoint;
pub use unit::{ClockType, TimeUnit};
