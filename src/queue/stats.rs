//! Pipeline counters shared by producers, the consumer and readers.

use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fast atomic counters for the event pipeline.
///
/// Each counter sits on its own cache line; producers bump `enqueued`,
/// `dropped` and `evicted` while the consumer bumps the rest.
#[derive(Debug, Default)]
pub struct PipelineStats {
    enqueued: CachePadded<AtomicU64>,
    dropped: CachePadded<AtomicU64>,
    evicted: CachePadded<AtomicU64>,
    processed: CachePadded<AtomicU64>,
    protocol_errors: CachePadded<AtomicU64>,
    spans_lost: CachePadded<AtomicU64>,
    flushes: CachePadded<AtomicU64>,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Events accepted by the queue, including ones later evicted
    pub enqueued: u64,
    /// Events rejected or evicted because of capacity or shutdown
    pub dropped: u64,
    /// Accepted events pushed out of the queue by `drop_oldest`; also in `dropped`
    pub evicted: u64,
    /// Accepted events neither applied nor evicted yet
    pub in_flight: u64,
    /// Events applied by the consumer, including rejected ones
    pub processed: u64,
    /// Events the consumer could not apply
    pub protocol_errors: u64,
    /// Timer spans evicted without a sample
    pub spans_lost: u64,
    /// Metric windows finalized
    pub flushes: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// An accepted event was pushed out before the consumer saw it
    #[inline]
    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spans_lost(&self, count: u64) {
        if count > 0 {
            self.spans_lost.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_flushes(&self, count: u64) {
        self.flushes.fetch_add(count, Ordering::Relaxed);
    }

    /// Events accepted but neither applied nor evicted
    pub fn in_flight(&self) -> u64 {
        let enqueued = self.enqueued.load(Ordering::Acquire);
        let evicted = self.evicted.load(Ordering::Acquire);
        let processed = self.processed.load(Ordering::Acquire);
        enqueued.saturating_sub(evicted).saturating_sub(processed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let enqueued = self.enqueued.load(Ordering::Relaxed);
        let evicted = self.evicted.load(Ordering::Relaxed);
        let processed = self.processed.load(Ordering::Relaxed);
        StatsSnapshot {
            enqueued,
            dropped: self.dropped.load(Ordering::Relaxed),
            evicted,
            in_flight: enqueued.saturating_sub(evicted).saturating_sub(processed),
            processed,
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            spans_lost: self.spans_lost.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}
