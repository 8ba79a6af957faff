//! Configuration, errors and logging shared by every eventstats module.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AveragingMode, Config, ConfigBuilder, DefaultOptions, EagerMetric, FlushConfig, GaugeOptions,
    LogLevel, LoggingConfig, MetricOptions, MetricOverride, OverflowPolicy, QueueConfig,
    TimerOptions,
};
pub use error::{Result, StatsError};
pub use logging::init_logging;
