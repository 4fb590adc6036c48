//! Outbound socket messages.

use std::fmt;
use std::sync::Arc;

/// Callback receiving each inbound frame the peer pushes on a session.
pub type FrameSender = Arc<dyn Fn(String) + Send + Sync>;

/// One text frame to write to the session for `uri`.
///
/// The `sender` is registered as the inbound-frame handler when this message
/// causes a new session to be opened.
#[derive(Clone)]
pub struct SocketMessage {
    uri: String,
    message: String,
    sender: FrameSender,
}

impl SocketMessage {
    pub fn new(
        uri: impl Into<String>,
        message: impl Into<String>,
        sender: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            uri: uri.into(),
            message: message.into(),
            sender: Arc::new(sender),
        }
    }

    /// Creates a message that shares an existing frame sender.
    pub fn with_sender(
        uri: impl Into<String>,
        message: impl Into<String>,
        sender: FrameSender,
    ) -> Self {
        Self {
            uri: uri.into(),
            message: message.into(),
            sender,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn sender(&self) -> &FrameSender {
        &self.sender
    }
}

impl fmt::Debug for SocketMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketMessage")
            .field("uri", &self.uri)
            .field("len", &self.message.len())
            .finish_non_exhaustive()
    }
}
