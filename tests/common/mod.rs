//! Common test utilities and fixtures.

#![allow(dead_code)]

use eventstats::core::{Config, ConfigBuilder, OverflowPolicy, QueueConfig};
use eventstats::metrics::{Registry, Summary};
use eventstats::queue::{Dispatcher, PipelineStats};
use eventstats::{Engine, RegistryView};
use std::sync::Arc;
use std::time::Duration;

/// Config whose windows never elapse on their own, so only explicit
/// flushes finalize them.
pub fn quiet_config() -> Config {
    ConfigBuilder::new()
        .flush_interval(Duration::from_secs(3600))
        .build()
        .unwrap()
}

pub fn start_engine() -> Engine {
    Engine::start(quiet_config()).unwrap()
}

/// Summary of the most recently finalized window of `name`
pub fn current(view: &RegistryView, name: &str) -> Summary {
    let snapshot = view
        .get(name)
        .unwrap_or_else(|| panic!("metric '{}' not found", name));
    snapshot
        .current
        .as_ref()
        .unwrap_or_else(|| panic!("metric '{}' has no finalized window", name))
        .summary
        .clone()
}

/// Dispatcher and registry with no consumer thread; the test drains by hand.
pub fn stalled_pipeline(capacity: usize, overflow: OverflowPolicy) -> (Dispatcher, Registry) {
    let stats = Arc::new(PipelineStats::new());
    let queue = QueueConfig {
        capacity,
        overflow,
        block_timeout: Duration::from_millis(1),
    };
    let dispatcher = Dispatcher::new(&queue, Arc::clone(&stats)).unwrap();
    let registry = Registry::new(&quiet_config(), stats).unwrap();
    (dispatcher, registry)
}
