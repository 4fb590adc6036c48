//! # Tether Transport
//!
//! Network transport implementations for the Tether client.
//!
//! This crate provides concrete implementations of the transport traits
//! defined in `tether-core`. Each transport sits behind a feature flag.
//!
//! ## Features
//!
//! - `http-client`: [`ReqwestTransport`], an [`HttpTransport`](tether_core::HttpTransport)
//!   backed by reqwest
//! - `ws-client`: [`TungsteniteConnector`], a
//!   [`SocketConnector`](tether_core::SocketConnector) backed by tokio-tungstenite
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  QueuedClient       │  (tether-core)
//! ├─────────────────────┤
//! │  transport traits   │  (tether-core)
//! ├─────────────────────┤
//! │  tether-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_core::{ClientConfig, QueuedClient};
//! use tether_transport::{ReqwestTransport, TungsteniteConnector};
//!
//! let config = ClientConfig::new("api.example.com", 8080);
//! let http = ReqwestTransport::new(config.endpoint())?;
//! let client = QueuedClient::new(config, Arc::new(http), Arc::new(TungsteniteConnector::new()));
//! client.start().await?;
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "http-client")]
pub use http::ReqwestTransport;

#[cfg(feature = "ws-client")]
pub use websocket::TungsteniteConnector;
