//! Unified error types for the Tether client core.
//!
//! Each layer owns one error enum: the transport seam, the outbound queues,
//! the response dispatcher and the caller-facing client.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a bound transport implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The remote peer actively refused the connection.
    ///
    /// This is the only failure class that makes the connection eligible for
    /// the bounded retry loop.
    #[error("connection refused: {addr}")]
    ConnectionRefused {
        /// The `host:port` that refused.
        addr: String,
    },

    /// Connection failed for a reason other than refusal.
    #[error("connection failed: {addr} - {reason}")]
    ConnectionFailed {
        /// The `host:port` that failed to connect.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// The connect attempt did not complete within the configured timeout.
    #[error("connect to {addr} timed out")]
    Timeout {
        /// The `host:port` being connected to.
        addr: String,
    },

    /// Writing to a live connection or session failed.
    #[error("failed to send: {0}")]
    SendFailed(String),

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a send failure.
    pub fn send(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }

    /// Creates a connection closed error.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the connection-refused failure class.
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. })
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Queue Errors
// =============================================================================

/// Errors raised by an outbound queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue has been stopped and accepts no more items.
    #[error("queue '{name}' is stopped")]
    Stopped {
        /// Name of the stopped queue.
        name: String,
    },

    /// The drain loop was already started.
    #[error("queue '{name}' already has a running drain loop")]
    AlreadyStarted {
        /// Name of the queue.
        name: String,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Outcome of a reply or failure that could not be handed to the caller.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The request was submitted without a response receiver.
    #[error("request {request_id} has no response receiver")]
    NoReceiver {
        /// Id of the request.
        request_id: u64,
    },

    /// A failure arrived for a request with no error handler.
    #[error("request {request_id} failed without an error handler: {error}")]
    Unhandled {
        /// Id of the request.
        request_id: u64,
        /// The failure itself.
        error: TransportError,
    },
}

// =============================================================================
// Client Errors
// =============================================================================

/// Errors returned by caller-facing client operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The client has been stopped.
    #[error("client is stopped")]
    Stopped,

    /// Queue error.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
