//! # Tether
//!
//! A queued, self-healing HTTP and WebSocket client for Rust.
//!
//! ## Overview
//!
//! Tether talks to one remote endpoint. Callers hand it HTTP requests and
//! WebSocket messages without blocking; background drain loops deliver them
//! in order, replies come back through per-request receivers, and a lost
//! connection is re-established on a bounded schedule.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────────┐
//! │   Runtime   │────▶│ QueuedClient │────▶│ request queue ─────│──▶ HttpTransport
//! │  (config,   │     │              │────▶│ socket queue ──────│──▶ SocketConnector
//! │   logging)  │     └──────────────┘     └────────────────────┘
//! └─────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, installs logging, starts and stops the client
//! - **Core**: queues, connection manager, session table and response dispatch
//! - **Transport**: reqwest and tokio-tungstenite implementations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TetherRuntime::load()?;
//!     runtime.init_logging();
//!     let client = runtime.start().await?;
//!
//!     let request = client
//!         .request("/status")
//!         .text_receiver(|status, _, body| println!("{status}: {body}"))
//!         .build();
//!     client.send_http_request(request)?;
//!
//!     runtime.run(&client).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `http-client`, `ws-client`, `full-transport`: bundled transports

pub use tether_core as core;
pub use tether_runtime as runtime;
pub use tether_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tether_runtime::{ConfigLoader, TetherConfig, TetherRuntime};

    // Client and its values
    pub use tether_core::prelude::*;

    // Logging macros
    pub use tether_runtime::prelude::*;
}
