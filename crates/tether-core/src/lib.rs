//! # Tether Core
//!
//! The core engine of the Tether client.
//!
//! This crate provides a queued, self-healing client for one remote
//! endpoint: HTTP requests and WebSocket messages are accepted without
//! blocking, drained in order by background tasks, and handed to pluggable
//! transports. The connection is watched and re-established on a bounded
//! schedule.
//!
//! ## Layers
//!
//! ### Values
//!
//! - **Requests**: immutable [`HttpRequest`] values built with
//!   [`HttpRequestBuilder`], answered through a [`ResponseReceiver`]
//! - **Socket messages**: [`SocketMessage`] carrying a target URI, a text
//!   payload and the [`FrameSender`] that receives inbound frames
//!
//! ### Engine
//!
//! - **Queues**: [`OutboundQueue`] with a drain loop per queue
//! - **Connection**: [`ConnectionManager`] owning the [`ConnectionState`] and
//!   the bounded retry run
//! - **Sessions**: [`SessionTable`] caching one socket session per URI
//! - **Dispatch**: [`ResponseDispatcher`] delivering replies and failures
//!
//! ### Transport seam
//!
//! - [`HttpTransport`], [`SocketConnector`] and [`SocketSession`] are
//!   implemented by `tether-transport` or by test doubles
//!
//! ## Flow
//!
//! ```text
//! ┌────────┐   ┌───────────────┐   ┌───────────────────┐   ┌───────────────┐
//! │ caller │──▶│ request queue │──▶│ ConnectionManager │──▶│ HttpTransport │
//! │        │   └───────────────┘   └───────────────────┘   └───────┬───────┘
//! │        │                                 ResponseDispatcher ◀──┘
//! │        │   ┌───────────────┐   ┌───────────────────┐   ┌─────────────────┐
//! │        │──▶│ socket queue  │──▶│   SessionTable    │──▶│ SocketConnector │
//! └────────┘   └───────────────┘   └───────────────────┘   └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::{ClientConfig, QueuedClient, SocketMessage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("api.example.com", 8080);
//!     let client = QueuedClient::new(config, Arc::new(MyHttp), Arc::new(MyWs));
//!     client.start().await?;
//!
//!     let request = client
//!         .request("/status")
//!         .text_receiver(|status, _, body| println!("{status}: {body}"))
//!         .build();
//!     client.send_http_request(request)?;
//!
//!     client.send_socket_message(SocketMessage::new("/chat", "hello", |frame| {
//!         println!("inbound: {frame}");
//!     }))?;
//!
//!     client.stop().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod queue;
pub mod request;
pub mod session;
pub mod transport;

pub use client::QueuedClient;

pub use connection::{ConnectionManager, ConnectionState, RetryRun, RetryStep, StateCell};

pub use dispatcher::ResponseDispatcher;

pub use error::{
    ClientError, ClientResult, DispatchError, DispatchResult, QueueError, QueueResult,
    TransportError, TransportResult,
};

pub use message::{FrameSender, SocketMessage};

pub use queue::{FnListener, IdleTracker, OutboundQueue, QueueListener};

pub use request::{
    BinaryReceiver, BoxedReceiver, ErrorHandler, HttpMethod, HttpReply, HttpRequest,
    HttpRequestBuilder, MultiMap, RequestIdGenerator, ResponseBody, ResponseReceiver,
    TextReceiver, WithErrorHandler,
};

pub use session::SessionTable;

pub use transport::{
    BoxedConnector, BoxedHttpTransport, BoxedSession, ClientConfig, CloseHandler, Endpoint,
    HttpTransport, QueueConfig, ReplyFuture, RetryConfig, SessionHandlers, SocketConnector,
    SocketSession,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::client::QueuedClient;
    pub use super::connection::ConnectionState;
    pub use super::error::{ClientError, ClientResult, TransportError, TransportResult};
    pub use super::message::SocketMessage;
    pub use super::request::{
        HttpMethod, HttpReply, HttpRequest, HttpRequestBuilder, ResponseBody, ResponseReceiver,
    };
    pub use super::transport::{
        ClientConfig, HttpTransport, ReplyFuture, SessionHandlers, SocketConnector,
        SocketSession,
    };
}
