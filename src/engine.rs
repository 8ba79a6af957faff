//! Process wiring: one bounded queue, one consumer thread, many producers.
//!
//! The consumer is the only thread that touches metric state. It waits on
//! three sources at once: queued events, a ticker at the shortest flush
//! interval, and control requests. Flushing happens between events on
//! that same thread, so no metric is ever read mid-update.

use crate::chrono::{Calibration, InternalClock, SystemClock};
use crate::core::{Config, Result, StatsError};
use crate::events::{attribute, counter, gauge, timer, EventMessage};
use crate::metrics::{AttributeValue, Registry, RegistryView, SpanId, DEFAULT_SPAN_ID};
use crate::queue::{Dispatcher, StatsSnapshot};
use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const CONSUMER_THREAD_NAME: &str = "eventstats-consumer";

enum Control {
    /// Apply everything queued so far, finalize all windows, then ack
    Flush(Sender<()>),
    Shutdown,
}

/// A running aggregation pipeline.
///
/// Dropping the engine shuts it down: pending events are applied and
/// every metric gets a final flush.
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    view: RegistryView,
    control: Sender<Control>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Validate `config`, make sure the clocks are calibrated and spawn
    /// the consumer thread.
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;
        let calibration = Calibration::ensure_installed()?;

        let dispatcher = Arc::new(Dispatcher::new(&config.queue, Arc::default())?);
        let registry = Registry::new(&config, Arc::clone(dispatcher.stats()))?;
        let view = registry.view();
        let (control, control_rx) = unbounded();
        let tick_every = config.tick_interval();

        let worker = {
            let dispatcher = Arc::clone(&dispatcher);
            thread::Builder::new()
                .name(CONSUMER_THREAD_NAME.to_string())
                .spawn(move || run_consumer(&dispatcher, registry, &control_rx, tick_every))?
        };

        tracing::info!(
            queue_capacity = config.queue.capacity,
            overflow = ?config.queue.overflow,
            tick = ?tick_every,
            cycles_per_sec = calibration.cycles_per_sec(),
            "Started eventstats engine"
        );

        Ok(Self {
            dispatcher,
            view,
            control,
            worker: Some(worker),
        })
    }

    /// Cloneable handle for instrumentation call sites
    pub fn producer(&self) -> Producer {
        Producer {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    /// Read-only access to published metric state
    pub fn view(&self) -> RegistryView {
        self.view.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.view.stats()
    }

    /// Apply every event accepted so far and finalize all windows now.
    ///
    /// Returns once the consumer has published the result.
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = bounded(1);
        self.control
            .send(Control::Flush(ack))
            .map_err(|_| StatsError::QueueClosed)?;
        done.recv().map_err(|_| StatsError::WorkerPanicked)
    }

    /// Stop accepting events, apply what is queued, flush and join.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.dispatcher.close();
        // the consumer exits on either the message or the disconnect
        let _ = self.control.send(Control::Shutdown);
        worker.join().map_err(|_| StatsError::WorkerPanicked)?;

        let stats = self.view.stats();
        tracing::info!(
            processed = stats.processed,
            dropped = stats.dropped,
            evicted = stats.evicted,
            in_flight = stats.in_flight,
            protocol_errors = stats.protocol_errors,
            "Stopped eventstats engine"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Engine shutdown failed: {}", e);
        }
    }
}

fn run_consumer(
    dispatcher: &Dispatcher,
    mut registry: Registry,
    control: &Receiver<Control>,
    tick_every: Duration,
) {
    let ticker = tick(tick_every);
    let events = dispatcher.receiver();

    loop {
        select! {
            recv(events) -> event => {
                if let Ok(event) = event {
                    registry.apply(event);
                }
            },
            recv(ticker) -> _ => {
                registry.flush_due();
            },
            recv(control) -> request => match request {
                Ok(Control::Flush(ack)) => {
                    dispatcher.drain(&mut registry);
                    registry.flush_all();
                    let _ = ack.send(());
                },
                Ok(Control::Shutdown) | Err(_) => {
                    let drained = dispatcher.drain(&mut registry);
                    registry.flush_all();
                    tracing::debug!(drained, "Consumer drained queue on shutdown");
                    break;
                },
            },
        }
    }
}

/// Instrumentation handle: one method per (destination, event) pair.
///
/// Every method stamps the event, enqueues it and returns its sequence
/// number. Counter, gauge and timer events use the internal clock;
/// attribute SETs use the system clock. An `Err` means the event was
/// dropped and counted; callers on hot paths usually ignore it.
#[derive(Clone)]
pub struct Producer {
    dispatcher: Arc<Dispatcher>,
}

impl Producer {
    /// Enqueue a prebuilt message
    #[inline]
    pub fn send(&self, message: EventMessage) -> Result<u64> {
        self.dispatcher.enqueue(message)
    }

    pub fn counter_init(&self, name: &str, value: i64) -> Result<u64> {
        self.send(counter::create_init_event(name, value, InternalClock::now()))
    }

    pub fn counter_increment(&self, name: &str, delta: i64) -> Result<u64> {
        self.send(counter::create_increment_event(name, delta, InternalClock::now()))
    }

    pub fn counter_decrement(&self, name: &str, delta: i64) -> Result<u64> {
        self.send(counter::create_decrement_event(name, delta, InternalClock::now()))
    }

    pub fn counter_set(&self, name: &str, value: i64) -> Result<u64> {
        self.send(counter::create_set_event(name, value, InternalClock::now()))
    }

    pub fn gauge_init(&self, name: &str, value: f64) -> Result<u64> {
        self.send(gauge::create_init_event(name, value, InternalClock::now()))
    }

    pub fn gauge_set(&self, name: &str, value: f64) -> Result<u64> {
        self.send(gauge::create_set_event(name, value, InternalClock::now()))
    }

    pub fn timer_init(&self, name: &str) -> Result<u64> {
        self.send(timer::create_init_event(name, InternalClock::now()))
    }

    pub fn timer_start(&self, name: &str, id: SpanId) -> Result<u64> {
        self.send(timer::create_start_event(name, id, InternalClock::now()))
    }

    pub fn timer_stop(&self, name: &str, id: SpanId) -> Result<u64> {
        self.send(timer::create_stop_event(name, id, InternalClock::now()))
    }

    pub fn timer_discard(&self, name: &str, id: SpanId) -> Result<u64> {
        self.send(timer::create_discard_event(name, id, InternalClock::now()))
    }

    pub fn timer_heartbeat(&self, name: &str, id: SpanId) -> Result<u64> {
        self.send(timer::create_heartbeat_event(name, id, InternalClock::now()))
    }

    /// Start the span that needs no caller-side id
    pub fn timer_start_default(&self, name: &str) -> Result<u64> {
        self.timer_start(name, DEFAULT_SPAN_ID)
    }

    pub fn timer_stop_default(&self, name: &str) -> Result<u64> {
        self.timer_stop(name, DEFAULT_SPAN_ID)
    }

    pub fn attribute_set(&self, name: &str, value: impl Into<AttributeValue>) -> Result<u64> {
        self.send(attribute::create_set_event(name, value, SystemClock::now()))
    }

    /// Whether the engine still accepts events
    pub fn is_open(&self) -> bool {
        !self.dispatcher.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConfigBuilder;

    #[test]
    fn test_consumer_thread_is_named() {
        let engine = Engine::start(Config::default()).unwrap();
        let name = engine
            .worker
            .as_ref()
            .and_then(|worker| worker.thread().name().map(str::to_owned));
        assert_eq!(name.as_deref(), Some(CONSUMER_THREAD_NAME));
    }

    #[test]
    fn test_flush_after_shutdown_fails() {
        let mut engine = Engine::start(Config::default()).unwrap();
        let producer = engine.producer();
        producer.counter_increment("hits", 1).unwrap();

        engine.shutdown().unwrap();
        assert!(!engine.is_running());
        assert!(!producer.is_open());
        assert!(engine.shutdown().is_ok());
        assert!(matches!(engine.flush(), Err(StatsError::QueueClosed)));
        assert!(matches!(
            producer.counter_increment("hits", 1),
            Err(StatsError::QueueClosed)
        ));
        assert_eq!(engine.stats().processed, 1);
    }

    #[test]
    fn test_invalid_config_refused() {
        let mut config = ConfigBuilder::new().build().unwrap();
        config.flush.retained_windows = 0;
        assert!(Engine::start(config).is_err());
    }
}
