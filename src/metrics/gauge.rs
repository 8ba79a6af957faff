//! Last-value gauge with rolling window statistics.

use crate::chrono::TimePoint;
use crate::core::config::{AveragingMode, GaugeOptions};
use crate::core::{Result, StatsError};
use crate::metrics::statistics::Statistics;
use crate::metrics::types::{FlushContext, GaugeSummary};

/// Scalar gauge
pub struct Gauge {
    value: Option<f64>,
    stats: Statistics,
    averaging: AveragingMode,
    moving_avg: Option<f64>,
    updated: Option<TimePoint>,
}

impl Gauge {
    pub fn new(options: &GaugeOptions) -> Self {
        Self {
            value: None,
            stats: Statistics::new(),
            averaging: options.averaging,
            moving_avg: None,
            updated: None,
        }
    }

    /// Set the starting value without recording a sample
    pub fn init(&mut self, value: f64, timestamp: TimePoint) -> Result<()> {
        check_finite(value)?;
        self.value = Some(value);
        self.updated = Some(timestamp);
        Ok(())
    }

    /// Record a new value
    pub fn set(&mut self, value: f64, timestamp: TimePoint) -> Result<()> {
        check_finite(value)?;
        self.value = Some(value);
        self.updated = Some(timestamp);
        self.stats.add_value(value);

        if let AveragingMode::Exponential { smoothing } = self.averaging {
            self.moving_avg = Some(match self.moving_avg {
                Some(prev) => smoothing * value + (1.0 - smoothing) * prev,
                None => value,
            });
        }
        Ok(())
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn updated(&self) -> Option<TimePoint> {
        self.updated
    }

    /// Statistics of the current window
    pub fn window(&self) -> &Statistics {
        &self.stats
    }

    /// Summarize the window and start the next one
    pub fn finalize(&mut self, _ctx: &FlushContext) -> GaugeSummary {
        let avg = match self.averaging {
            AveragingMode::Window => self.stats.avg(),
            AveragingMode::Exponential { .. } => self.moving_avg,
        };
        let summary = GaugeSummary {
            value: self.value,
            count: self.stats.count(),
            min: self.stats.min().unwrap_or(0.0),
            max: self.stats.max().unwrap_or(0.0),
            avg: avg.unwrap_or(0.0),
        };
        self.stats.reset();
        summary
    }
}

fn check_finite(value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StatsError::protocol(format!("gauge value must be finite, got {}", value)))
    }
}
