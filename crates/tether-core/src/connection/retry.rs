//! Bounded reconnection policy.
//!
//! One [`RetryRun`] covers a single scheduler firing. The caller sleeps one
//! tick, then asks the run what to do given the current connection state.

use super::state::ConnectionState;
use crate::transport::RetryConfig;

/// What the retry loop should do after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Keep backing off; no dial this tick.
    Wait,
    /// Dial the peer now.
    Reconnect,
    /// The connection left `Closed`; stop without dialing.
    Recovered,
    /// The attempt budget is spent; stop until the next firing.
    Exhausted,
}

impl RetryStep {
    /// Whether the run is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Recovered | Self::Exhausted)
    }
}

/// State of one bounded retry run.
#[derive(Debug, Clone)]
pub struct RetryRun {
    attempts: u32,
    max_attempts: u32,
    reconnect_every: u32,
}

impl RetryRun {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempts: 0,
            max_attempts: config.max_attempts,
            reconnect_every: config.reconnect_every.max(1),
        }
    }

    /// Counted attempts so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Advances the run by one tick.
    pub fn tick(&mut self, state: ConnectionState) -> RetryStep {
        if state != ConnectionState::Closed {
            return RetryStep::Recovered;
        }

        self.attempts += 1;
        if self.attempts > self.max_attempts {
            return RetryStep::Exhausted;
        }

        if self.attempts % self.reconnect_every == 0 {
            RetryStep::Reconnect
        } else {
            RetryStep::Wait
        }
    }
}
