//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TetherConfig {
    /// Client settings for the remote endpoint.
    #[serde(default)]
    pub client: ClientSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Client
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Remote host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Remote port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Connection pool size hint for the HTTP transport.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Flush queues on every send.
    #[serde(default = "default_true")]
    pub auto_flush: bool,

    /// Keep pooled connections alive between requests.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Use `https` / `wss`.
    #[serde(default)]
    pub use_tls: bool,

    /// Quiet time after which the request queue counts as idle, in milliseconds.
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,

    /// HTTP request queue tuning.
    #[serde(default)]
    pub request_queue: QueueSettings,

    /// Socket message queue tuning.
    #[serde(default)]
    pub socket_queue: QueueSettings,

    /// Reconnect schedule.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_size: default_pool_size(),
            auto_flush: true,
            keep_alive: true,
            use_tls: false,
            idle_threshold_ms: default_idle_threshold_ms(),
            request_queue: QueueSettings::default(),
            socket_queue: QueueSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl ClientSettings {
    /// Converts to core client config.
    pub fn to_core_config(&self) -> tether_core::ClientConfig {
        tether_core::ClientConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            pool_size: self.pool_size,
            auto_flush: self.auto_flush,
            keep_alive: self.keep_alive,
            use_tls: self.use_tls,
            request_queue: self.request_queue.to_core_queue(),
            socket_queue: self.socket_queue.to_core_queue(),
            retry: self.retry.to_core_retry(),
            idle_threshold: Duration::from_millis(self.idle_threshold_ms),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_pool_size() -> usize {
    5
}

fn default_idle_threshold_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Pending items that trigger an automatic flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Drain loop poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl QueueSettings {
    /// Converts to core queue config.
    pub fn to_core_queue(&self) -> tether_core::QueueConfig {
        tether_core::QueueConfig {
            batch_size: self.batch_size,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn default_batch_size() -> usize {
    50
}

fn default_poll_interval_ms() -> u64 {
    50
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Time between retry runs in milliseconds.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Sleep between iterations of one run in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Iterations allowed per run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Dial on every n-th iteration.
    #[serde(default = "default_reconnect_every")]
    pub reconnect_every: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            tick_ms: default_tick_ms(),
            max_attempts: default_max_attempts(),
            reconnect_every: default_reconnect_every(),
        }
    }
}

impl RetrySettings {
    /// Converts to core retry config.
    pub fn to_core_retry(&self) -> tether_core::RetryConfig {
        tether_core::RetryConfig {
            period: Duration::from_millis(self.period_ms),
            tick: Duration::from_millis(self.tick_ms),
            max_attempts: self.max_attempts,
            reconnect_every: self.reconnect_every,
        }
    }
}

fn default_period_ms() -> u64 {
    10_000
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_reconnect_every() -> u32 {
    3
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file path, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Log file rotation.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `tether_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            filters: HashMap::new(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span events to log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}
