//! WebSocket transport.
//!
//! This module provides the tokio-tungstenite backed
//! [`SocketConnector`](tether_core::SocketConnector).

#[cfg(feature = "ws-client")]
mod client;
#[cfg(feature = "ws-client")]
pub use client::TungsteniteConnector;
