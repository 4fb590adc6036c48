//! Transport capabilities consumed by the client core.
//!
//! The core never touches sockets. It drives a bound [`HttpTransport`] for
//! request/reply traffic and a [`SocketConnector`] for bidirectional
//! sessions. Concrete implementations live in `tether-transport`; tests bind
//! in-memory fakes.
//!
//! # Request hand-off
//!
//! [`HttpTransport::send`] is synchronous and returns the reply as a boxed
//! future. The call itself is the hand-off: the drain loop makes it in queue
//! order, and the returned future is awaited on a separate task so one slow
//! reply never holds up the queue.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::config::Endpoint;
use crate::error::TransportResult;
use crate::message::FrameSender;
use crate::request::{HttpReply, HttpRequest};

// =============================================================================
// HTTP
// =============================================================================

/// Future resolving to the reply for one request.
pub type ReplyFuture = BoxFuture<'static, TransportResult<HttpReply>>;

/// Request/reply transport bound to one remote endpoint.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Establishes (or re-establishes) the logical connection.
    ///
    /// Implementations must report a refused connection as
    /// [`TransportError::ConnectionRefused`](crate::TransportError::ConnectionRefused);
    /// it is the only failure the retry loop reacts to.
    async fn connect(&self, endpoint: &Endpoint) -> TransportResult<()>;

    /// Hands one request to the wire and returns its pending reply.
    fn send(&self, request: Arc<HttpRequest>) -> ReplyFuture;

    /// Releases pooled connections.
    async fn close(&self) -> TransportResult<()>;
}

/// Shared HTTP transport handle.
pub type BoxedHttpTransport = Arc<dyn HttpTransport>;

// =============================================================================
// Sockets
// =============================================================================

/// Callback invoked once when the peer closes a session.
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

/// Callbacks a connector wires into a freshly opened session.
#[derive(Clone)]
pub struct SessionHandlers {
    /// Receives every inbound text frame.
    pub on_frame: FrameSender,
    /// Fires when the session ends, whichever side closed it.
    pub on_close: CloseHandler,
}

/// Live bidirectional session.
pub trait SocketSession: Send + Sync {
    /// Queues a text frame. Fails once the session is gone.
    fn write_text(&self, text: &str) -> TransportResult<()>;

    /// Starts a close handshake.
    fn close(&self);
}

/// Shared session handle.
pub type BoxedSession = Arc<dyn SocketSession>;

/// Opens bidirectional sessions on the endpoint.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Opens a session for `uri` and wires `handlers` into it.
    async fn open(
        &self,
        endpoint: &Endpoint,
        uri: &str,
        handlers: SessionHandlers,
    ) -> TransportResult<BoxedSession>;
}

/// Shared connector handle.
pub type BoxedConnector = Arc<dyn SocketConnector>;
