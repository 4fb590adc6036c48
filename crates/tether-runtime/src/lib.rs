//! Tether Runtime - configuration and startup layer for the Tether client.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`ConfigLoader`, `TetherConfig`)
//! - Logging setup from configuration (`init_from_config`)
//! - Client startup and shutdown orchestration (`TetherRuntime`)
//!
//! # Transport Features
//!
//! Transports come from `tether-transport` and are enabled through features:
//!
//! - `http-client`: reqwest-backed HTTP transport
//! - `ws-client`: tokio-tungstenite WebSocket connector
//!
//! With both enabled, [`TetherRuntime::start`] wires them up from the
//! configuration:
//!
//! ```ignore
//! use tether_runtime::TetherRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = TetherRuntime::load()?;
//!     runtime.init_logging();
//!
//!     let client = runtime.start().await?;
//!     let request = client
//!         .request("/status")
//!         .text_receiver(|status, _, body| println!("{status}: {body}"))
//!         .build();
//!     client.send_http_request(request)?;
//!
//!     // Run until Ctrl+C
//!     runtime.run(&client).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transports
//!
//! Any [`HttpTransport`](tether_core::HttpTransport) and
//! [`SocketConnector`](tether_core::SocketConnector) pair can be supplied
//! instead:
//!
//! ```ignore
//! let client = runtime
//!     .start_with(Arc::new(MyHttp::new()), Arc::new(MyWs::new()))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ClientSettings, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, TetherConfig,
    validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{filter_directives, init_from_config};
pub use runtime::TetherRuntime;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
