//! Per-window sample accumulator.
//!
//! Tracks count, sum, min and max exactly and, when asked to, feeds a
//! CKMS sketch for constant-memory quantile estimates.

use crate::metrics::types::{Quantile, StatsSummary};
use quantiles::ckms::CKMS;

/// Running statistics of the samples seen since the last reset
pub struct Statistics {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    /// Quantile sketch and its error bound
    sketch: Option<(CKMS<f64>, f64)>,
}

impl Statistics {
    /// Accumulator without quantile estimation
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            sketch: None,
        }
    }

    /// Accumulator that also estimates quantiles within `error`
    pub fn with_quantiles(error: f64) -> Self {
        Self {
            sketch: Some((CKMS::new(error), error)),
            ..Self::new()
        }
    }

    /// Add a single sample
    #[inline]
    pub fn add_value(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if let Some((sketch, _)) = self.sketch.as_mut() {
            sketch.insert(value);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Estimated value at quantile `q` in `[0, 1]`
    pub fn quantile(&self, q: f64) -> Option<f64> {
        let (sketch, _) = self.sketch.as_ref()?;
        sketch.query(q).map(|(_, value)| value)
    }

    /// Finalize into a summary; empty windows report zeros
    pub fn summarize(&self, quantiles: &[f64]) -> StatsSummary {
        if self.count == 0 {
            return StatsSummary::default();
        }

        StatsSummary {
            count: self.count,
            sum: self.sum,
            min: self.min,
            max: self.max,
            avg: self.sum / self.count as f64,
            quantiles: quantiles
                .iter()
                .filter_map(|&q| self.quantile(q).map(|value| Quantile { q, value }))
                .collect(),
        }
    }

    /// Reset for the next window
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.min = f64::MAX;
        self.max = f64::MIN;
        if let Some((sketch, error)) = self.sketch.as_mut() {
            *sketch = CKMS::new(*error);
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
