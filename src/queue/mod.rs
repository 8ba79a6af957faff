//! Bounded multi-producer queue feeding the single consumer.
//!
//! Producers never touch metric state; they only enqueue. Each accepted
//! event gets a sequence number under the same lock that pushes it into
//! the channel, so sequence order, channel order and application order
//! are one and the same total order.

pub mod stats;

pub use stats::{PipelineStats, StatsSnapshot};

use crate::core::config::{OverflowPolicy, QueueConfig};
use crate::core::{Result, StatsError};
use crate::events::{delete_event, EventMessage};
use crate::metrics::Registry;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An accepted event and its position in the total order
#[derive(Debug)]
pub struct QueuedEvent {
    pub sequence: u64,
    pub message: EventMessage,
}

/// Producer side of the pipeline
pub struct Dispatcher {
    sender: Sender<QueuedEvent>,
    receiver: Receiver<QueuedEvent>,
    capacity: usize,
    policy: OverflowPolicy,
    block_timeout: Duration,
    /// Next sequence number; held while pushing
    gate: Mutex<u64>,
    closed: AtomicBool,
    dropping: AtomicBool,
    stats: Arc<PipelineStats>,
}

impl Dispatcher {
    pub fn new(config: &QueueConfig, stats: Arc<PipelineStats>) -> Result<Self> {
        if config.capacity == 0 {
            return Err(StatsError::config("queue capacity must be greater than 0"));
        }

        let (sender, receiver) = bounded(config.capacity);
        Ok(Self {
            sender,
            receiver,
            capacity: config.capacity,
            policy: config.overflow,
            block_timeout: config.block_timeout,
            gate: Mutex::new(0),
            closed: AtomicBool::new(false),
            dropping: AtomicBool::new(false),
            stats,
        })
    }

    /// Hand `message` to the consumer.
    ///
    /// Returns the event's sequence number. A rejected event is released
    /// and counted as dropped before the error is returned.
    pub fn enqueue(&self, message: EventMessage) -> Result<u64> {
        let mut next = self.gate.lock();

        if self.closed.load(Ordering::Acquire) {
            self.reject(message);
            return Err(StatsError::QueueClosed);
        }

        let sequence = *next;
        let event = QueuedEvent { sequence, message };
        let outcome = match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => self.overflow(event),
            Err(TrySendError::Disconnected(event)) => {
                self.reject(event.message);
                Err(StatsError::QueueClosed)
            },
        };

        outcome?;
        *next += 1;
        drop(next);

        self.stats.record_enqueued();
        if self.dropping.load(Ordering::Relaxed) {
            self.dropping.store(false, Ordering::Relaxed);
        }
        Ok(sequence)
    }

    fn overflow(&self, event: QueuedEvent) -> Result<()> {
        match self.policy {
            OverflowPolicy::DropNewest => {
                self.reject(event.message);
                Err(StatsError::QueueFull)
            },
            OverflowPolicy::DropOldest => {
                if let Ok(oldest) = self.receiver.try_recv() {
                    self.evict(oldest.message);
                }
                match self.sender.try_send(event) {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        self.reject(e.into_inner().message);
                        Err(StatsError::QueueFull)
                    },
                }
            },
            OverflowPolicy::Block => match self.sender.send_timeout(event, self.block_timeout) {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(event)) => {
                    self.reject(event.message);
                    Err(StatsError::BlockTimeout {
                        timeout_ms: self.block_timeout.as_millis() as u64,
                    })
                },
                Err(SendTimeoutError::Disconnected(event)) => {
                    self.reject(event.message);
                    Err(StatsError::QueueClosed)
                },
            },
        }
    }

    /// Release an event that was never accepted
    fn reject(&self, message: EventMessage) {
        self.stats.record_dropped(1);
        self.release(message);
    }

    /// Release an accepted event that the consumer will now never see
    fn evict(&self, message: EventMessage) {
        self.stats.record_evicted();
        self.release(message);
    }

    fn release(&self, message: EventMessage) {
        if !self.dropping.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                metric = message.destination_name(),
                queued = self.len(),
                "Event queue is dropping events"
            );
        }
        delete_event(message);
    }

    /// Next pending event, if any
    #[inline]
    pub fn try_next(&self) -> Option<QueuedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Consumer end of the channel, for use with `select!`
    pub fn receiver(&self) -> &Receiver<QueuedEvent> {
        &self.receiver
    }

    /// Apply every pending event to `registry`. Returns how many were applied.
    pub fn drain(&self, registry: &mut Registry) -> usize {
        let mut applied = 0;
        while let Some(event) = self.try_next() {
            registry.apply(event);
            applied += 1;
        }
        applied
    }

    /// Stop accepting events. Already accepted events stay queued.
    pub fn close(&self) {
        let _gate = self.gate.lock();
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get current queue length (approximate).
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }
}
