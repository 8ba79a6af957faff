//! Span timer.
//!
//! Every span id moves through `STARTED -> STOPPED` (a sample is recorded)
//! or `STARTED -> DISCARDED` (no sample). Open spans live in an arena keyed
//! by id. A span that sees no activity for `idle_timeout`, or that has to
//! make room once `max_active_spans` is reached, is evicted and counted as
//! a lost sample. Capacity eviction picks the span whose START was applied
//! earliest; an ordered index keeps that lookup logarithmic.

use crate::chrono::{Duration, TimePoint};
use crate::core::config::TimerOptions;
use crate::core::{Result, StatsError};
use crate::metrics::statistics::Statistics;
use crate::metrics::types::{FlushContext, TimerSummary};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Caller-chosen span identifier
pub type SpanId = u64;

/// Span id used when the caller does not track concurrent spans
pub const DEFAULT_SPAN_ID: SpanId = u64::MAX;

#[derive(Debug, Clone, Copy)]
struct ActiveSpan {
    started: TimePoint,
    last_seen: TimePoint,
    /// Key in `by_start`
    order: u64,
}

/// Timer metric state
pub struct Timer {
    options: TimerOptions,
    active: AHashMap<SpanId, ActiveSpan>,
    /// Open spans by start order, oldest first
    by_start: BTreeMap<u64, SpanId>,
    next_order: u64,
    stats: Statistics,
    lost_in_window: u64,
    lost_total: u64,
}

impl Timer {
    pub fn new(options: &TimerOptions) -> Self {
        let stats = if options.quantiles.is_empty() {
            Statistics::new()
        } else {
            Statistics::with_quantiles(options.quantile_error)
        };

        Self {
            options: options.clone(),
            active: AHashMap::new(),
            by_start: BTreeMap::new(),
            next_order: 0,
            stats,
            lost_in_window: 0,
            lost_total: 0,
        }
    }

    /// Open span `id` at `timestamp`. Restarting an open id moves its start.
    ///
    /// Returns the number of spans evicted to stay within capacity.
    pub fn start(&mut self, id: SpanId, timestamp: TimePoint) -> u64 {
        let mut evicted = 0;
        if self.remove_span(id).is_none() && self.active.len() >= self.options.max_active_spans {
            if let Some((_, oldest)) = self.by_start.pop_first() {
                self.active.remove(&oldest);
                evicted = 1;
                self.record_lost(1);
                tracing::debug!(span_id = oldest, "Evicted oldest span to stay within capacity");
            }
        }

        let order = self.next_order;
        self.next_order += 1;
        self.by_start.insert(order, id);
        self.active.insert(
            id,
            ActiveSpan {
                started: timestamp,
                last_seen: timestamp,
                order,
            },
        );
        evicted
    }

    /// Close span `id` and record `timestamp - start` as a sample.
    ///
    /// An id with no open span is ignored and yields `Ok(None)`. A span that
    /// cannot be measured is closed anyway and counted as lost.
    pub fn stop(&mut self, id: SpanId, timestamp: TimePoint) -> Result<Option<Duration>> {
        let Some(span) = self.remove_span(id) else {
            tracing::trace!(span_id = id, "Ignoring stop for a span that is not open");
            return Ok(None);
        };

        let measured = elapsed_between(&span.started, &timestamp).and_then(|elapsed| {
            let sample = elapsed
                .as_f64(self.options.unit)
                .map_err(|e| StatsError::protocol(format!("cannot measure span: {}", e)))?;
            Ok((elapsed, sample))
        });
        let (elapsed, sample) = match measured {
            Ok(measured) => measured,
            Err(e) => {
                self.record_lost(1);
                return Err(e);
            },
        };

        self.stats.add_value(sample);
        Ok(Some(elapsed))
    }

    /// Drop span `id` without a sample. Returns whether it was open.
    pub fn discard(&mut self, id: SpanId) -> bool {
        self.remove_span(id).is_some()
    }

    fn remove_span(&mut self, id: SpanId) -> Option<ActiveSpan> {
        let span = self.active.remove(&id)?;
        self.by_start.remove(&span.order);
        Some(span)
    }

    /// Mark span `id` as still alive
    pub fn heartbeat(&mut self, id: SpanId, timestamp: TimePoint) -> bool {
        match self.active.get_mut(&id) {
            Some(span) => {
                span.last_seen = timestamp;
                true
            },
            None => false,
        }
    }

    /// Evict spans idle for longer than the timeout as of `now`.
    pub fn evict_idle(&mut self, now: TimePoint) -> u64 {
        let timeout = Duration::from(self.options.idle_timeout);
        let before = self.active.len();
        let by_start = &mut self.by_start;
        self.active.retain(|id, span| {
            match idle_for(&span.last_seen, &now) {
                Some(idle) if idle > timeout => {
                    tracing::debug!(span_id = *id, "Evicting idle span");
                    by_start.remove(&span.order);
                    false
                },
                _ => true,
            }
        });
        let evicted = (before - self.active.len()) as u64;
        self.record_lost(evicted);
        evicted
    }

    fn record_lost(&mut self, count: u64) {
        self.lost_in_window += count;
        self.lost_total += count;
    }

    /// Whether span `id` is open
    pub fn is_active(&self, id: SpanId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_spans(&self) -> usize {
        self.active.len()
    }

    /// Statistics of the current window, in the configured unit
    pub fn window(&self) -> &Statistics {
        &self.stats
    }

    /// Spans lost since creation
    pub fn lost_total(&self) -> u64 {
        self.lost_total
    }

    /// Summarize the window and start the next one.
    ///
    /// Idle spans are evicted first so they show up in this window's loss.
    pub fn finalize(&mut self, ctx: &FlushContext) -> TimerSummary {
        self.evict_idle(ctx.now);

        let stats = self.stats.summarize(&self.options.quantiles);
        let summary = TimerSummary {
            unit: self.options.unit,
            rate_per_sec: ctx.per_sec(stats.count as f64),
            stats,
            active_spans: self.active.len(),
            lost_spans: self.lost_in_window,
        };
        self.stats.reset();
        self.lost_in_window = 0;
        summary
    }
}

fn elapsed_between(start: &TimePoint, stop: &TimePoint) -> Result<Duration> {
    stop.checked_duration_since(start)
        .map_err(|e| StatsError::protocol(format!("span start and stop disagree: {}", e)))
}

/// Idle time of a span, converting `now` onto the span's clock if needed
fn idle_for(last_seen: &TimePoint, now: &TimePoint) -> Option<Duration> {
    let now = if last_seen.clock() == now.clock() {
        *now
    } else {
        TimePoint::convert_to(last_seen.clock(), *now).ok()?
    };
    now.checked_duration_since(last_seen).ok()
}
