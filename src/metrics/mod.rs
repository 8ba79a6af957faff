//! Metric state machines and their registry.
//!
//! Each metric instance is owned by the consumer thread and mutated only
//! by applying queued events. Readers see the summaries published at
//! each flush through [`RegistryView`].

pub mod attribute;
pub mod counter;
pub mod gauge;
pub mod registry;
pub mod ring_buffer;
pub mod statistics;
pub mod timer;
pub mod types;

pub use attribute::{Attribute, AttributeValue};
pub use counter::Counter;
pub use gauge::Gauge;
pub use registry::{MetricSnapshot, Registry, RegistryView};
pub use ring_buffer::HistoryRing;
pub use statistics::Statistics;
pub use timer::{SpanId, Timer, DEFAULT_SPAN_ID};
pub use types::{
    AttributeSummary, CounterSummary, FlushContext, GaugeSummary, MetricKind, Quantile,
    StatsSummary, Summary, TimerSummary, WindowSummary,
};

use crate::core::config::MetricOptions;

/// A metric instance of any kind
pub enum Metric {
    Counter(Counter),
    Gauge(Gauge),
    Timer(Timer),
    Attribute(Attribute),
}

impl Metric {
    /// Fresh instance of `kind` configured with `options`
    pub fn new(kind: MetricKind, options: &MetricOptions) -> Self {
        match kind {
            MetricKind::Counter => Metric::Counter(Counter::new()),
            MetricKind::Gauge => Metric::Gauge(Gauge::new(&options.gauge)),
            MetricKind::Timer => Metric::Timer(Timer::new(&options.timer)),
            MetricKind::Attribute => Metric::Attribute(Attribute::new()),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Timer(_) => MetricKind::Timer,
            Metric::Attribute(_) => MetricKind::Attribute,
        }
    }

    /// Finalize the current window and reset the accumulators
    pub fn finalize(&mut self, ctx: &FlushContext) -> Summary {
        match self {
            Metric::Counter(counter) => Summary::Counter(counter.finalize(ctx)),
            Metric::Gauge(gauge) => Summary::Gauge(gauge.finalize(ctx)),
            Metric::Timer(timer) => Summary::Timer(timer.finalize(ctx)),
            Metric::Attribute(attribute) => Summary::Attribute(attribute.finalize()),
        }
    }

    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Metric::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Metric::Gauge(gauge) => Some(gauge),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Timer> {
        match self {
            Metric::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Metric::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }
}
