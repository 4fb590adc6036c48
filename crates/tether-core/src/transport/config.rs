//! Configuration types for the queued client.

use std::time::Duration;

// =============================================================================
// Retry Config
// =============================================================================

/// Reconnection schedule.
///
/// Every `period` the scheduler starts one bounded run: it sleeps `tick`
/// between iterations, gives up after `max_attempts` iterations and only
/// dials the peer on every `reconnect_every`-th iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Interval between scheduler firings.
    pub period: Duration,
    /// Sleep between iterations of one run.
    pub tick: Duration,
    /// Iterations allowed per run.
    pub max_attempts: u32,
    /// Dial on every n-th iteration.
    pub reconnect_every: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            tick: Duration::from_millis(1000),
            max_attempts: 10,
            reconnect_every: 3,
        }
    }
}

// =============================================================================
// Queue Config
// =============================================================================

/// Tuning for one outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Pending items that trigger an automatic flush.
    pub batch_size: usize,
    /// How long the drain loop waits for a batch before reporting idle.
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            poll_interval: Duration::from_millis(50),
        }
    }
}

// =============================================================================
// Client Config
// =============================================================================

/// Configuration for a [`QueuedClient`](crate::QueuedClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Remote host.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Maximum pooled connections kept by the transport.
    pub pool_size: usize,
    /// Flush after every enqueue.
    pub auto_flush: bool,
    /// Keep HTTP connections alive between requests.
    pub keep_alive: bool,
    /// Use `https`/`wss` instead of `http`/`ws`.
    pub use_tls: bool,
    /// HTTP request queue tuning.
    pub request_queue: QueueConfig,
    /// Socket message queue tuning.
    pub socket_queue: QueueConfig,
    /// Reconnection schedule.
    pub retry: RetryConfig,
    /// Quiet period after which the idle marker is refreshed.
    pub idle_threshold: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            connect_timeout: Duration::from_millis(3000),
            pool_size: 5,
            auto_flush: true,
            keep_alive: true,
            use_tls: false,
            request_queue: QueueConfig::default(),
            socket_queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            idle_threshold: Duration::from_millis(3000),
        }
    }
}

impl ClientConfig {
    /// Creates a config for `host:port` with defaults elsewhere.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the connection pool size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Enables or disables flush-on-enqueue.
    pub fn with_auto_flush(mut self, auto_flush: bool) -> Self {
        self.auto_flush = auto_flush;
        self
    }

    /// Sets the reconnection schedule.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the endpoint this config points at.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: self.connect_timeout,
            pool_size: self.pool_size,
            keep_alive: self.keep_alive,
            use_tls: self.use_tls,
        }
    }
}

/// Connection parameters handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub pool_size: usize,
    pub keep_alive: bool,
    pub use_tls: bool,
}

impl Endpoint {
    /// `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute HTTP URL for a request URI.
    pub fn http_url(&self, uri: &str) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}{}", self.addr(), with_leading_slash(uri))
    }

    /// Absolute WebSocket URL for a session URI.
    pub fn ws_url(&self, uri: &str) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{scheme}://{}{}", self.addr(), with_leading_slash(uri))
    }
}

fn with_leading_slash(uri: &str) -> String {
    if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{uri}")
    }
}
