//! Response receivers: the capability a caller supplies to get a reply back.

use std::fmt;
use std::sync::Arc;

use super::multimap::MultiMap;
use crate::error::TransportError;

/// Callback invoked when a request fails at the transport level.
pub type ErrorHandler = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Body handed to a [`ResponseReceiver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// UTF-8 text (decoded lossily).
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl ResponseBody {
    /// Builds the body in the form requested by the receiver.
    pub fn from_bytes(bytes: Vec<u8>, text: bool) -> Self {
        if text {
            match String::from_utf8(bytes) {
                Ok(s) => Self::Text(s),
                Err(e) => Self::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            }
        } else {
            Self::Binary(bytes)
        }
    }

    /// Returns the text, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// Returns the raw bytes of either variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

/// Receives the reply to one request.
///
/// Only [`response`](Self::response) is required. The header-carrying form
/// defaults to the short form, so simple receivers stay one method long.
pub trait ResponseReceiver: Send + Sync {
    /// Delivers status, content type and body.
    fn response(&self, status: u16, content_type: Option<&str>, body: ResponseBody);

    /// Delivers the reply together with every response header.
    fn response_with_headers(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: ResponseBody,
        _headers: &MultiMap,
    ) {
        self.response(status, content_type, body);
    }

    /// Whether the body should be delivered as text.
    fn is_text(&self) -> bool {
        true
    }

    /// Handler for transport failures, if one was composed in.
    fn error_handler(&self) -> Option<&ErrorHandler> {
        None
    }
}

/// Shared receiver handle carried by a request.
pub type BoxedReceiver = Arc<dyn ResponseReceiver>;

// =============================================================================
// Closure-backed receivers
// =============================================================================

/// Receiver that decodes the body as text and hands it to a closure.
pub struct TextReceiver<F> {
    f: F,
}

impl<F> TextReceiver<F>
where
    F: Fn(u16, Option<&str>, String) + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ResponseReceiver for TextReceiver<F>
where
    F: Fn(u16, Option<&str>, String) + Send + Sync,
{
    fn response(&self, status: u16, content_type: Option<&str>, body: ResponseBody) {
        let text = match body {
            ResponseBody::Text(s) => s,
            ResponseBody::Binary(b) => String::from_utf8_lossy(&b).into_owned(),
        };
        (self.f)(status, content_type, text);
    }
}

/// Receiver that hands the raw body bytes to a closure.
pub struct BinaryReceiver<F> {
    f: F,
}

impl<F> BinaryReceiver<F>
where
    F: Fn(u16, Option<&str>, Vec<u8>) + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ResponseReceiver for BinaryReceiver<F>
where
    F: Fn(u16, Option<&str>, Vec<u8>) + Send + Sync,
{
    fn response(&self, status: u16, content_type: Option<&str>, body: ResponseBody) {
        let bytes = match body {
            ResponseBody::Text(s) => s.into_bytes(),
            ResponseBody::Binary(b) => b,
        };
        (self.f)(status, content_type, bytes);
    }

    fn is_text(&self) -> bool {
        false
    }
}

// =============================================================================
// Error handler composition
// =============================================================================

/// A receiver with a separately supplied error handler folded in.
///
/// Success and failure then reach the caller through one object, so the
/// connection manager never branches on where the handler came from.
pub struct WithErrorHandler {
    inner: BoxedReceiver,
    on_error: ErrorHandler,
}

impl WithErrorHandler {
    /// Composes `on_error` into `inner`.
    pub fn new(inner: BoxedReceiver, on_error: ErrorHandler) -> Self {
        Self { inner, on_error }
    }
}

impl ResponseReceiver for WithErrorHandler {
    fn response(&self, status: u16, content_type: Option<&str>, body: ResponseBody) {
        self.inner.response(status, content_type, body);
    }

    fn response_with_headers(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: ResponseBody,
        headers: &MultiMap,
    ) {
        self.inner
            .response_with_headers(status, content_type, body, headers);
    }

    fn is_text(&self) -> bool {
        self.inner.is_text()
    }

    fn error_handler(&self) -> Option<&ErrorHandler> {
        Some(&self.on_error)
    }
}

impl fmt::Debug for WithErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithErrorHandler")
            .field("is_text", &self.inner.is_text())
            .finish_non_exhaustive()
    }
}
