//! eventstats - event-driven in-process metrics aggregation.
//!
//! Instrumented code emits small typed events (counter increments, gauge
//! samples, timer span starts and stops, attribute updates) into a bounded
//! queue. A single consumer thread applies them in enqueue order to named
//! metric state machines and finalizes per-metric aggregation windows.
//!
//! # Features
//!
//! - **Dual clocks**: a cheap cycle-based internal clock for intervals and
//!   a system clock for human-facing timestamps, with explicit conversion
//! - **Non-blocking producers**: bounded queue with a configurable
//!   overflow policy; every drop is counted
//! - **Single-writer state**: metrics are only touched by the consumer,
//!   readers see snapshots published at each flush
//! - **Windowed summaries**: counter rates, gauge statistics, timer
//!   quantiles and retained window history
//!
//! # Architecture
//!
//! - `chrono`: time units, durations, time points and clocks
//! - `events`: the typed event protocol
//! - `queue`: the bounded dispatcher and pipeline counters
//! - `metrics`: metric state machines and the registry
//! - `engine`: consumer thread and producer handles
//! - `core`: configuration, errors and logging
//!
//! # Example
//!
//! ```no_run
//! use eventstats::{Config, Engine};
//!
//! fn main() -> eventstats::Result<()> {
//!     let mut engine = Engine::start(Config::default())?;
//!     let producer = engine.producer();
//!
//!     producer.counter_increment("requests", 1)?;
//!     producer.timer_start("db.query", 7)?;
//!     producer.timer_stop("db.query", 7)?;
//!
//!     engine.flush()?;
//!     for metric in engine.view().snapshot() {
//!         println!("{}: {:?}", metric.name, metric.current);
//!     }
//!     engine.shutdown()
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]

pub mod chrono;
pub mod core;
pub mod engine;
pub mod events;
pub mod metrics;
pub mod queue;

// Re-export core types for convenience
pub use crate::chrono::{Calibration, ClockType, Duration, InternalClock, SystemClock, TimePoint, TimeUnit};
pub use crate::core::{init_logging, Config, ConfigBuilder, Result, StatsError};
pub use crate::engine::{Engine, Producer};
pub use crate::events::{DestinationType, EventMessage, EventType};
pub use crate::metrics::{AttributeValue, MetricKind, MetricSnapshot, RegistryView, Summary, WindowSummary};
pub use crate::queue::StatsSnapshot;
