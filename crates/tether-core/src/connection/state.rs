//! Connection state shared between the manager and the retry scheduler.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the logical connection to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Closed = 0,
    Connecting = 1,
    Open = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
        })
    }
}

/// Atomic cell holding a [`ConnectionState`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `state` and returns the previous one.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }

    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(ConnectionState::Closed)
    }
}
