//! HTTP transport.
//!
//! This module provides the reqwest-backed [`HttpTransport`](tether_core::HttpTransport).

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::ReqwestTransport;
