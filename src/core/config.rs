//! Configuration management for eventstats.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Per-metric overrides selected by glob patterns
//! - Validation and defaults

use crate::chrono::TimeUnit;
use crate::core::{Result, StatsError};
use crate::metrics::MetricKind;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Complete configuration for an engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event queue configuration
    pub queue: QueueConfig,
    /// Aggregation window configuration
    pub flush: FlushConfig,
    /// Kind-specific options applied to every metric
    pub defaults: DefaultOptions,
    /// Per-metric overrides, first matching pattern wins
    pub metrics: Vec<MetricOverride>,
    /// Metrics created up front instead of on first event
    pub eager: Vec<EagerMetric>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Event queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending events
    pub capacity: usize,
    /// What happens to an event that finds the queue full
    pub overflow: OverflowPolicy,
    /// How long one `Block` producer waits for room before dropping
    #[serde(with = "humantime_serde")]
    pub block_timeout: Duration,
}

/// Queue overflow strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Reject the incoming event
    DropNewest,
    /// Evict the oldest pending event to make room
    DropOldest,
    /// Wait up to `block_timeout`, then reject.
    ///
    /// The wait happens while holding the sequencing lock, so producers
    /// queue up behind it: with N producers blocked on a full queue the
    /// last one can wait up to N x `block_timeout` in total.
    Block,
}

/// Aggregation window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Window length
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Finalized windows kept per metric
    pub retained_windows: usize,
}

/// Kind-specific defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultOptions {
    /// Gauge defaults
    pub gauge: GaugeOptions,
    /// Timer defaults
    pub timer: TimerOptions,
}

/// Gauge options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeOptions {
    /// How the reported average is computed
    pub averaging: AveragingMode,
}

/// Gauge averaging modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AveragingMode {
    /// Arithmetic mean of the window's samples
    #[default]
    Window,
    /// Exponential moving average carried across windows
    Exponential {
        /// Weight of the newest sample, in (0, 1]
        smoothing: f64,
    },
}

/// Timer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerOptions {
    /// Unit samples are reported in
    pub unit: TimeUnit,
    /// Quantiles estimated per window
    pub quantiles: Vec<f64>,
    /// Rank error of the quantile sketch
    pub quantile_error: f64,
    /// Open spans with no activity for this long are evicted
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Open spans kept per timer before the oldest is evicted
    pub max_active_spans: usize,
}

/// Options for metrics whose name matches `pattern`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricOverride {
    /// Glob over dot-separated names: `*`, `?` and `**`
    pub pattern: String,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub flush_interval: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained_windows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<GaugeOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerOptions>,
    #[serde(skip)]
    matcher: OnceCell<Regex>,
}

/// A metric instance created when the registry is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EagerMetric {
    pub name: String,
    pub kind: MetricKind,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Options resolved for one metric name
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOptions {
    pub flush_interval: Duration,
    pub retained_windows: usize,
    pub gauge: GaugeOptions,
    pub timer: TimerOptions,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            capacity: 65_536,
            overflow: OverflowPolicy::DropNewest,
            block_timeout: Duration::from_millis(1),
        }
    }
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropNewest
    }
}

impl Default for FlushConfig {
    fn default() -> Self {
        FlushConfig {
            interval: Duration::from_secs(1),
            retained_windows: 60,
        }
    }
}

impl Default for TimerOptions {
    fn default() -> Self {
        TimerOptions {
            unit: TimeUnit::Usec,
            quantiles: vec![0.5, 0.9, 0.99],
            quantile_error: 0.001,
            idle_timeout: Duration::from_secs(10),
            max_active_spans: 10_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Default for MetricOptions {
    fn default() -> Self {
        let flush = FlushConfig::default();
        MetricOptions {
            flush_interval: flush.interval,
            retained_windows: flush.retained_windows,
            gauge: GaugeOptions::default(),
            timer: TimerOptions::default(),
        }
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl GaugeOptions {
    fn validate(&self, scope: &str) -> Result<()> {
        if let AveragingMode::Exponential { smoothing } = self.averaging {
            if !(smoothing > 0.0 && smoothing <= 1.0) {
                return Err(StatsError::config(format!(
                    "{}: smoothing must be in (0, 1], got {}",
                    scope, smoothing
                )));
            }
        }
        Ok(())
    }
}

impl TimerOptions {
    fn validate(&self, scope: &str) -> Result<()> {
        for q in &self.quantiles {
            if !(*q > 0.0 && *q < 1.0) {
                return Err(StatsError::config(format!(
                    "{}: quantiles must be in (0, 1), got {}",
                    scope, q
                )));
            }
        }

        if !(self.quantile_error > 0.0 && self.quantile_error < 1.0) {
            return Err(StatsError::config(format!(
                "{}: quantile_error must be in (0, 1), got {}",
                scope, self.quantile_error
            )));
        }

        if self.max_active_spans == 0 {
            return Err(StatsError::config(format!(
                "{}: max_active_spans must be greater than 0",
                scope
            )));
        }

        Ok(())
    }
}

impl MetricOverride {
    /// Override for names matching `pattern`
    pub fn new(pattern: impl Into<String>) -> Self {
        MetricOverride {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    /// Whether `name` matches the pattern. The pattern is compiled once.
    pub fn matches(&self, name: &str) -> Result<bool> {
        let matcher = self.matcher.get_or_try_init(|| compile_glob(&self.pattern))?;
        Ok(matcher.is_match(name))
    }
}

/// Translate a metric-name glob into an anchored regex
fn compile_glob(pattern: &str) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(StatsError::config("metric pattern must not be empty"));
    }

    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                expr.push_str(".*");
            },
            '*' => expr.push_str("[^.]*"),
            '?' => expr.push_str("[^.]"),
            other => {
                let mut buf = [0u8; 4];
                expr.push_str(&regex::escape(other.encode_utf8(&mut buf)));
            },
        }
    }
    expr.push('$');

    Ok(Regex::new(&expr)?)
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Queue validation
        if self.queue.capacity == 0 {
            return Err(StatsError::config("queue capacity must be greater than 0"));
        }

        // Flush validation
        validate_window("flush", self.flush.interval, self.flush.retained_windows)?;

        self.defaults.gauge.validate("defaults.gauge")?;
        self.defaults.timer.validate("defaults.timer")?;

        for rule in &self.metrics {
            let scope = format!("metrics['{}']", rule.pattern);
            rule.matches("")?;
            validate_window(
                &scope,
                rule.flush_interval.unwrap_or(self.flush.interval),
                rule.retained_windows.unwrap_or(self.flush.retained_windows),
            )?;
            if let Some(gauge) = &rule.gauge {
                gauge.validate(&scope)?;
            }
            if let Some(timer) = &rule.timer {
                timer.validate(&scope)?;
            }
        }

        let mut seen: HashMap<&str, MetricKind> = HashMap::new();
        for metric in &self.eager {
            if metric.name.is_empty() {
                return Err(StatsError::config("eager metric name must not be empty"));
            }
            match seen.insert(&metric.name, metric.kind) {
                Some(previous) if previous != metric.kind => {
                    return Err(StatsError::config(format!(
                        "eager metric '{}' listed as both {} and {}",
                        metric.name, previous, metric.kind
                    )));
                },
                _ => {},
            }
        }

        Ok(())
    }

    /// Resolve the options for metric `name`
    pub fn options_for(&self, name: &str) -> Result<MetricOptions> {
        let mut options = MetricOptions {
            flush_interval: self.flush.interval,
            retained_windows: self.flush.retained_windows,
            gauge: self.defaults.gauge,
            timer: self.defaults.timer.clone(),
        };

        for rule in &self.metrics {
            if !rule.matches(name)? {
                continue;
            }
            if let Some(interval) = rule.flush_interval {
                options.flush_interval = interval;
            }
            if let Some(retained) = rule.retained_windows {
                options.retained_windows = retained;
            }
            if let Some(gauge) = rule.gauge {
                options.gauge = gauge;
            }
            if let Some(timer) = &rule.timer {
                options.timer = timer.clone();
            }
            break;
        }

        Ok(options)
    }

    /// Granularity the consumer wakes at: the shortest window of any metric
    pub fn tick_interval(&self) -> Duration {
        self.metrics
            .iter()
            .filter_map(|rule| rule.flush_interval)
            .fold(self.flush.interval, Duration::min)
    }
}

fn validate_window(scope: &str, interval: Duration, retained: usize) -> Result<()> {
    if interval.is_zero() {
        return Err(StatsError::config(format!(
            "{}: flush interval must be greater than 0",
            scope
        )));
    }
    if retained == 0 {
        return Err(StatsError::config(format!(
            "{}: retained_windows must be greater than 0",
            scope
        )));
    }
    Ok(())
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| StatsError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Load configuration from a YAML file
    pub fn from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        self.from_yaml(&yaml)
    }

    /// Set queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue.capacity = capacity;
        self
    }

    /// Set overflow policy
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.config.queue.overflow = policy;
        self
    }

    /// Set how long `Block` waits for room
    pub fn block_timeout(mut self, timeout: Duration) -> Self {
        self.config.queue.block_timeout = timeout;
        self
    }

    /// Set the default window length
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush.interval = interval;
        self
    }

    /// Set the default number of retained windows
    pub fn retained_windows(mut self, count: usize) -> Self {
        self.config.flush.retained_windows = count;
        self
    }

    /// Set default timer options
    pub fn timer_defaults(mut self, options: TimerOptions) -> Self {
        self.config.defaults.timer = options;
        self
    }

    /// Set default gauge options
    pub fn gauge_defaults(mut self, options: GaugeOptions) -> Self {
        self.config.defaults.gauge = options;
        self
    }

    /// Append a per-metric override
    pub fn metric_override(mut self, rule: MetricOverride) -> Self {
        self.config.metrics.push(rule);
        self
    }

    /// Create `name` when the engine starts
    pub fn eager(mut self, name: impl Into<String>, kind: MetricKind) -> Self {
        self.config.eager.push(EagerMetric {
            name: name.into(),
            kind,
        });
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.capacity, 65_536);
        assert_eq!(config.queue.overflow, OverflowPolicy::DropNewest);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ConfigBuilder::new().queue_capacity(0).build();
        assert!(matches!(result, Err(StatsError::Config(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(ConfigBuilder::new().flush_interval(Duration::ZERO).build().is_err());
        assert!(ConfigBuilder::new().retained_windows(0).build().is_err());
    }

    #[test]
    fn test_invalid_timer_options() {
        let mut timer = TimerOptions::default();
        timer.quantiles = vec![0.5, 1.0];
        assert!(ConfigBuilder::new().timer_defaults(timer).build().is_err());

        let mut timer = TimerOptions::default();
        timer.max_active_spans = 0;
        assert!(ConfigBuilder::new().timer_defaults(timer).build().is_err());
    }

    #[test]
    fn test_invalid_smoothing() {
        let gauge = GaugeOptions {
            averaging: AveragingMode::Exponential { smoothing: 0.0 },
        };
        assert!(ConfigBuilder::new().gauge_defaults(gauge).build().is_err());
    }

    #[test]
    fn test_conflicting_eager_kinds() {
        let result = ConfigBuilder::new()
            .eager("queue.depth", MetricKind::Gauge)
            .eager("queue.depth", MetricKind::Counter)
            .build();
        assert!(result.is_err());

        let result = ConfigBuilder::new()
            .eager("queue.depth", MetricKind::Gauge)
            .eager("queue.depth", MetricKind::Gauge)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_glob_semantics() {
        let single = MetricOverride::new("db.*.latency");
        assert!(single.matches("db.users.latency").unwrap());
        assert!(!single.matches("db.users.shard1.latency").unwrap());

        let deep = MetricOverride::new("db.**");
        assert!(deep.matches("db.users.shard1.latency").unwrap());
        assert!(!deep.matches("http.requests").unwrap());

        let one = MetricOverride::new("cpu?");
        assert!(one.matches("cpu0").unwrap());
        assert!(!one.matches("cpu.").unwrap());
        assert!(!one.matches("cpu10").unwrap());
    }

    #[test]
    fn test_options_first_match_wins() {
        let mut fast = MetricOverride::new("http.*");
        fast.flush_interval = Some(Duration::from_millis(100));
        let mut slow = MetricOverride::new("http.requests");
        slow.flush_interval = Some(Duration::from_secs(10));
        slow.retained_windows = Some(5);

        let config = ConfigBuilder::new()
            .metric_override(fast)
            .metric_override(slow)
            .build()
            .unwrap();

        let options = config.options_for("http.requests").unwrap();
        assert_eq!(options.flush_interval, Duration::from_millis(100));
        assert_eq!(options.retained_windows, 60);

        let options = config.options_for("db.query").unwrap();
        assert_eq!(options, MetricOptions::default());
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
queue:
  capacity: 1024
  overflow: drop_oldest
flush:
  interval: 250ms
  retained_windows: 10
defaults:
  gauge:
    averaging:
      mode: exponential
      smoothing: 0.2
  timer:
    unit: ms
    quantiles: [0.5, 0.95]
    idle_timeout: 30s
metrics:
  - pattern: "rpc.**"
    flush_interval: 5s
eager:
  - name: build.version
    kind: attribute
logging:
  level: debug
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();
        assert_eq!(config.queue.capacity, 1024);
        assert_eq!(config.queue.overflow, OverflowPolicy::DropOldest);
        assert_eq!(config.queue.block_timeout, Duration::from_millis(1));
        assert_eq!(config.flush.interval, Duration::from_millis(250));
        assert_eq!(
            config.defaults.gauge.averaging,
            AveragingMode::Exponential { smoothing: 0.2 }
        );
        assert_eq!(config.defaults.timer.unit, TimeUnit::Msec);
        assert_eq!(config.defaults.timer.quantiles, vec![0.5, 0.95]);
        assert_eq!(config.defaults.timer.max_active_spans, 10_000);
        assert_eq!(config.defaults.timer.idle_timeout, Duration::from_secs(30));
        assert_eq!(
            config.options_for("rpc.client.call").unwrap().flush_interval,
            Duration::from_secs(5)
        );
        assert_eq!(config.eager[0].kind, MetricKind::Attribute);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let yaml = "defaults:\n  timer:\n    unit: fortnight\n";
        assert!(ConfigBuilder::new().from_yaml(yaml).is_err());
    }
}
