//! Connection lifecycle: state, bounded retry policy and the manager that
//! ties them to the HTTP transport.

pub mod manager;
pub mod retry;
pub mod state;

pub use manager::ConnectionManager;
pub use retry::{RetryRun, RetryStep};
pub use state::{ConnectionState, StateCell};
