//! Configuration module for the Tether runtime.
//!
//! This module provides layered configuration loading and validation for
//! the client and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    ClientSettings, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, QueueSettings,
    RetrySettings, SpanEventConfig, TetherConfig,
};
pub use validation::validate_config;
