//! Name-keyed registry of metric instances.
//!
//! The [`Registry`] is owned by the consumer thread: it is the only code
//! that creates, mutates or finalizes metrics. At every flush a metric's
//! summary and history are published as an immutable [`MetricSnapshot`]
//! through an `ArcSwap`, which is all a [`RegistryView`] ever reads. A
//! reader therefore sees either the previous or the next window, never a
//! half-applied one.

use crate::chrono::{InternalClock, SystemClock, TimePoint};
use crate::core::config::{Config, MetricOptions};
use crate::core::Result;
use crate::events::{delete_event, process_event};
use crate::metrics::ring_buffer::HistoryRing;
use crate::metrics::types::{FlushContext, MetricKind, WindowSummary};
use crate::metrics::Metric;
use crate::queue::{PipelineStats, QueuedEvent, StatsSnapshot};
use ahash::AHashMap;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Published state of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub kind: MetricKind,
    /// Most recently finalized window, if any
    pub current: Option<WindowSummary>,
    /// Retained windows, oldest first, including `current`
    pub history: Vec<WindowSummary>,
}

type Published = Arc<ArcSwap<MetricSnapshot>>;

struct MetricEntry {
    metric: Metric,
    options: MetricOptions,
    history: HistoryRing<WindowSummary>,
    window_start: TimePoint,
    due: Instant,
    published: Published,
}

/// Consumer-owned metric state
pub struct Registry {
    config: Config,
    entries: AHashMap<Arc<str>, MetricEntry>,
    published: Arc<DashMap<Arc<str>, Published>>,
    stats: Arc<PipelineStats>,
    last_applied: Option<u64>,
}

impl Registry {
    /// Build a registry and create every eager metric listed in `config`.
    ///
    /// Fails with [`StatsError::Config`](crate::core::StatsError::Config)
    /// when `config` does not validate.
    pub fn new(config: &Config, stats: Arc<PipelineStats>) -> Result<Self> {
        config.validate()?;

        let mut registry = Self {
            config: config.clone(),
            entries: AHashMap::new(),
            published: Arc::new(DashMap::new()),
            stats,
            last_applied: None,
        };

        for eager in &config.eager {
            registry.get_or_create(&eager.name, eager.kind)?;
        }
        Ok(registry)
    }

    /// Apply one queued event and release it.
    ///
    /// Failures are counted in the pipeline stats and logged; they never
    /// stop the consumer.
    pub fn apply(&mut self, event: QueuedEvent) {
        let QueuedEvent { sequence, message } = event;
        debug_assert!(self.last_applied.map_or(true, |last| sequence > last));
        self.last_applied = Some(sequence);

        let stats = Arc::clone(&self.stats);
        let outcome = self
            .get_or_create(message.destination_name(), message.destination_type())
            .and_then(|entry| {
                let lost_before = lost_spans(&entry.metric);
                let result = process_event(&mut entry.metric, &message);
                stats.record_spans_lost(lost_spans(&entry.metric) - lost_before);
                result
            });

        if let Err(e) = outcome {
            stats.record_protocol_error();
            tracing::warn!(
                sequence,
                metric = message.destination_name(),
                "Rejected event: {}",
                e
            );
        } else {
            tracing::trace!(sequence, metric = message.destination_name(), "Applied event");
        }

        stats.record_processed();
        delete_event(message);
    }

    fn get_or_create(&mut self, name: &str, kind: MetricKind) -> Result<&mut MetricEntry> {
        if !self.entries.contains_key(name) {
            let options = self.config.options_for(name)?;
            let entry = self.create_entry(name, kind, options);
            self.entries.insert(Arc::from(name), entry);
            tracing::debug!(metric = name, kind = %kind, "Created metric");
        }

        match self.entries.get_mut(name) {
            Some(entry) => Ok(entry),
            None => unreachable!("entry inserted above"),
        }
    }

    fn create_entry(&self, name: &str, kind: MetricKind, options: MetricOptions) -> MetricEntry {
        let published = Arc::new(ArcSwap::from_pointee(MetricSnapshot {
            name: name.to_owned(),
            kind,
            current: None,
            history: Vec::new(),
        }));
        self.published.insert(Arc::from(name), Arc::clone(&published));

        MetricEntry {
            metric: Metric::new(kind, &options),
            history: HistoryRing::new(options.retained_windows),
            window_start: SystemClock::now(),
            due: Instant::now() + options.flush_interval,
            options,
            published,
        }
    }

    /// Finalize every metric whose window has elapsed
    pub fn flush_due(&mut self) -> usize {
        self.flush_where(|entry, now| entry.due <= now)
    }

    /// Finalize every metric regardless of its schedule
    pub fn flush_all(&mut self) -> usize {
        self.flush_where(|_, _| true)
    }

    fn flush_where(&mut self, due: impl Fn(&MetricEntry, Instant) -> bool) -> usize {
        let now = Instant::now();
        let window_end = SystemClock::now();
        let internal_now = InternalClock::now();

        let mut flushed = 0;
        for entry in self.entries.values_mut() {
            if !due(entry, now) {
                continue;
            }

            let ctx = FlushContext {
                window_start: entry.window_start,
                window_end,
                now: internal_now,
            };
            let lost_before = lost_spans(&entry.metric);
            let summary = entry.metric.finalize(&ctx);
            self.stats
                .record_spans_lost(lost_spans(&entry.metric) - lost_before);

            entry.history.push(WindowSummary {
                start: ctx.window_start,
                end: ctx.window_end,
                summary,
            });
            entry.window_start = window_end;
            entry.due = now + entry.options.flush_interval;

            let previous = entry.published.load();
            entry.published.store(Arc::new(MetricSnapshot {
                name: previous.name.clone(),
                kind: previous.kind,
                current: entry.history.latest().cloned(),
                history: entry.history.to_vec(),
            }));
            flushed += 1;
        }

        if flushed > 0 {
            self.stats.record_flushes(flushed as u64);
            tracing::debug!(metrics = flushed, "Flushed metric windows");
        }
        flushed
    }

    /// Live state of metric `name`; consumer side only
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.entries.get(name).map(|entry| &entry.metric)
    }

    /// Sequence number of the last applied event
    pub fn last_applied_sequence(&self) -> Option<u64> {
        self.last_applied
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only handle for other threads
    pub fn view(&self) -> RegistryView {
        RegistryView {
            metrics: Arc::clone(&self.published),
            stats: Arc::clone(&self.stats),
        }
    }
}

fn lost_spans(metric: &Metric) -> u64 {
    metric.as_timer().map_or(0, |timer| timer.lost_total())
}

/// Cloneable read-only view of published metric state
#[derive(Clone)]
pub struct RegistryView {
    metrics: Arc<DashMap<Arc<str>, Published>>,
    stats: Arc<PipelineStats>,
}

impl RegistryView {
    /// Names of all known metrics, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.iter().map(|entry| entry.key().to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Last published state of `name`
    pub fn get(&self, name: &str) -> Option<Arc<MetricSnapshot>> {
        self.metrics.get(name).map(|entry| entry.value().load_full())
    }

    /// Every metric's last published state, sorted by name
    pub fn snapshot(&self) -> Vec<Arc<MetricSnapshot>> {
        let mut all: Vec<Arc<MetricSnapshot>> =
            self.metrics.iter().map(|entry| entry.value().load_full()).collect();
        all.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Pipeline counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
