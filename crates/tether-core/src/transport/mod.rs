//! Transport seam and configuration.
//!
//! This module provides the capability traits the client drives and the
//! configuration types that describe the remote endpoint.

pub mod capability;
pub mod config;

pub use capability::{
    BoxedConnector, BoxedHttpTransport, BoxedSession, CloseHandler, HttpTransport, ReplyFuture,
    SessionHandlers, SocketConnector, SocketSession,
};
pub use config::{ClientConfig, Endpoint, QueueConfig, RetryConfig};
