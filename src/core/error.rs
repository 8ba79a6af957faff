use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Event protocol error: {0}")]
    Protocol(String),

    #[error("Queue full: event dropped")]
    QueueFull,

    #[error("Queue closed: dispatcher no longer accepts events")]
    QueueClosed,

    #[error("Timeout error: queue stayed full for longer than {timeout_ms}ms")]
    BlockTimeout { timeout_ms: u64 },

    #[error("Invalid metric pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Consumer thread panicked")]
    WorkerPanicked,
}

/// Result type alias for eventstats operations
pub type Result<T> = std::result::Result<T, StatsError>;

impl StatsError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new calibration error
    pub fn calibration<S: Into<String>>(msg: S) -> Self {
        Self::Calibration(msg.into())
    }

    /// Creates a new usage error
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::Protocol(msg.into())
    }

    /// Returns true if the condition degrades to counted loss instead of
    /// failing the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::QueueFull | Self::QueueClosed | Self::BlockTimeout { .. }
        )
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Pattern(_) | Self::Yaml(_) => "config",
            Self::Calibration(_) => "calibration",
            Self::Usage(_) => "usage",
            Self::Protocol(_) => "protocol",
            Self::QueueFull | Self::QueueClosed | Self::BlockTimeout { .. } => "capacity",
            Self::Io(_) => "io",
            Self::WorkerPanicked => "worker",
        }
    }
}
