//! Signed integer counter.

use crate::chrono::TimePoint;
use crate::metrics::types::{CounterSummary, FlushContext};

/// Integer accumulator with a per-window net change
#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: i64,
    initialized: bool,
    window_delta: i64,
    updated: Option<TimePoint>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base value. Not counted as a change.
    pub fn init(&mut self, value: i64, timestamp: TimePoint) {
        self.value = value;
        self.initialized = true;
        self.updated = Some(timestamp);
    }

    pub fn increment(&mut self, delta: i64, timestamp: TimePoint) {
        self.apply_delta(delta, timestamp);
    }

    pub fn decrement(&mut self, delta: i64, timestamp: TimePoint) {
        self.apply_delta(delta.saturating_neg(), timestamp);
    }

    /// Replace the value outright; the jump counts toward the window rate
    pub fn set(&mut self, value: i64, timestamp: TimePoint) {
        self.apply_delta(value.saturating_sub(self.value), timestamp);
    }

    fn apply_delta(&mut self, delta: i64, timestamp: TimePoint) {
        self.value = self.value.saturating_add(delta);
        self.window_delta = self.window_delta.saturating_add(delta);
        self.initialized = true;
        self.updated = Some(timestamp);
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Net change since the last flush
    pub fn window_delta(&self) -> i64 {
        self.window_delta
    }

    /// Timestamp of the last applied event
    pub fn updated(&self) -> Option<TimePoint> {
        self.updated
    }

    /// Summarize the window and start the next one
    pub fn finalize(&mut self, ctx: &FlushContext) -> CounterSummary {
        let summary = CounterSummary {
            value: self.value,
            rate: self.window_delta,
            rate_per_sec: ctx.per_sec(self.window_delta as f64),
            initialized: self.initialized,
        };
        self.window_delta = 0;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrono::{ClockType, Duration};

    fn at(secs: i64) -> TimePoint {
        TimePoint::new(Duration::from_secs(secs), ClockType::System)
    }

    fn window(start: i64, end: i64) -> FlushContext {
        FlushContext {
            window_start: at(start),
            window_end: at(end),
            now: TimePoint::default(),
        }
    }

    #[test]
    fn test_init_then_increments() {
        let mut counter = Counter::new();
        assert!(!counter.is_initialized());

        counter.init(0, at(0));
        for _ in 0..5 {
            counter.increment(1, at(1));
        }

        assert!(counter.is_initialized());
        assert_eq!(counter.value(), 5);
        assert_eq!(counter.window_delta(), 5);
    }

    #[test]
    fn test_init_is_not_a_change() {
        let mut counter = Counter::new();
        counter.init(100, at(0));
        counter.decrement(30, at(1));

        assert_eq!(counter.value(), 70);
        assert_eq!(counter.window_delta(), -30);
    }

    #[test]
    fn test_set_replaces_value() {
        let mut counter = Counter::new();
        counter.increment(4, at(0));
        counter.set(10, at(1));

        assert_eq!(counter.value(), 10);
        assert_eq!(counter.window_delta(), 10);
        assert_eq!(counter.updated(), Some(at(1)));
    }

    #[test]
    fn test_finalize_resets_window() {
        let mut counter = Counter::new();
        counter.init(0, at(0));
        for _ in 0..5 {
            counter.increment(1, at(0));
        }

        let summary = counter.finalize(&window(0, 5));
        assert_eq!(summary.value, 5);
        assert_eq!(summary.rate, 5);
        assert_eq!(summary.rate_per_sec, 1.0);

        let next = counter.finalize(&window(5, 10));
        assert_eq!(next.value, 5);
        assert_eq!(next.rate, 0);
    }
}
