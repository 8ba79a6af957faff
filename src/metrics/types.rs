//! Metric kinds and the summaries a flush produces.
//!
//! Summaries are plain data so export code can serialize them as-is.

use crate::chrono::{TimePoint, TimeUnit};
use crate::metrics::attribute::AttributeValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Kind of metric instance an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Signed integer accumulator
    Counter,
    /// Last-set scalar with rolling statistics
    Gauge,
    /// Span durations
    Timer,
    /// Tagged value, last write wins
    Attribute,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Timer => "timer",
            MetricKind::Attribute => "attribute",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimated value at quantile `q`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantile {
    pub q: f64,
    pub value: f64,
}

/// Finalized sample statistics of one window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub quantiles: SmallVec<[Quantile; 4]>,
}

impl StatsSummary {
    /// Value estimated for quantile `q`, if it was requested
    pub fn quantile(&self, q: f64) -> Option<f64> {
        self.quantiles
            .iter()
            .find(|quantile| (quantile.q - q).abs() < f64::EPSILON)
            .map(|quantile| quantile.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSummary {
    /// Value at the end of the window
    pub value: i64,
    /// Net change applied during the window
    pub rate: i64,
    pub rate_per_sec: f64,
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeSummary {
    /// Last value set, possibly in an earlier window
    pub value: Option<f64>,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    /// Window mean or moving average, depending on the averaging mode
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSummary {
    /// Unit of every duration statistic below
    pub unit: TimeUnit,
    pub stats: StatsSummary,
    /// Completed spans per second of window
    pub rate_per_sec: f64,
    /// Spans still open when the window closed
    pub active_spans: usize,
    /// Spans evicted during the window without a sample
    pub lost_spans: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSummary {
    pub value: Option<AttributeValue>,
    /// Timestamp carried by the SET that produced `value`
    pub updated: Option<TimePoint>,
}

/// Kind-specific result of a finalized window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Summary {
    Counter(CounterSummary),
    Gauge(GaugeSummary),
    Timer(TimerSummary),
    Attribute(AttributeSummary),
}

impl Summary {
    pub fn kind(&self) -> MetricKind {
        match self {
            Summary::Counter(_) => MetricKind::Counter,
            Summary::Gauge(_) => MetricKind::Gauge,
            Summary::Timer(_) => MetricKind::Timer,
            Summary::Attribute(_) => MetricKind::Attribute,
        }
    }

    pub fn as_counter(&self) -> Option<&CounterSummary> {
        match self {
            Summary::Counter(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&GaugeSummary> {
        match self {
            Summary::Gauge(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&TimerSummary> {
        match self {
            Summary::Timer(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeSummary> {
        match self {
            Summary::Attribute(summary) => Some(summary),
            _ => None,
        }
    }
}

/// One retained window: its system-clock bounds and its summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub start: TimePoint,
    pub end: TimePoint,
    pub summary: Summary,
}

/// Bounds of the window being finalized
#[derive(Debug, Clone, Copy)]
pub struct FlushContext {
    /// System time the window opened
    pub window_start: TimePoint,
    /// System time the window closes
    pub window_end: TimePoint,
    /// Internal-clock reading taken at flush, for span idle checks
    pub now: TimePoint,
}

impl FlushContext {
    /// Window length in seconds, zero when the bounds are unusable
    pub fn window_secs(&self) -> f64 {
        self.window_end
            .checked_duration_since(&self.window_start)
            .and_then(|d| d.as_secs_f64())
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// `count` per second of window
    pub fn per_sec(&self, count: f64) -> f64 {
        let secs = self.window_secs();
        if secs > 0.0 {
            count / secs
        } else {
            0.0
        }
    }
}
