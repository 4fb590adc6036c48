//! Outbound HTTP request values.
//!
//! An [`HttpRequest`] is immutable once built. The queues, the connection
//! manager and the dispatcher only ever read it, and share it behind an
//! `Arc` between the drain loop and the task awaiting the reply.

mod builder;
mod multimap;
mod receiver;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use builder::HttpRequestBuilder;
pub use multimap::MultiMap;
pub use receiver::{
    BinaryReceiver, BoxedReceiver, ErrorHandler, ResponseBody, ResponseReceiver, TextReceiver,
    WithErrorHandler,
};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
        }
    }

    /// Methods whose query parameters travel in the URI rather than the body.
    pub fn params_in_uri(&self) -> bool {
        matches!(self, Self::Get | Self::Options | Self::Head | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" | "OPTION" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            "PATCH" => Ok(Self::Patch),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// One outbound unit of HTTP work.
#[derive(Clone)]
pub struct HttpRequest {
    pub(crate) id: u64,
    pub(crate) uri: String,
    pub(crate) method: HttpMethod,
    pub(crate) params: MultiMap,
    pub(crate) headers: MultiMap,
    pub(crate) body: Vec<u8>,
    pub(crate) remote_address: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) receiver: Option<BoxedReceiver>,
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) timestamp: SystemTime,
}

impl HttpRequest {
    /// Starts a builder for a request with the given id.
    pub fn builder(id: u64) -> HttpRequestBuilder {
        HttpRequestBuilder::new(id)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request URI, including the encoded query for URI-parameter methods.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn params(&self) -> &MultiMap {
        &self.params
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn receiver(&self) -> Option<&BoxedReceiver> {
        self.receiver.as_ref()
    }

    /// Handler for transport failures, whether or not a receiver was set.
    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.error_handler
            .as_ref()
            .or_else(|| self.receiver.as_ref().and_then(|r| r.error_handler()))
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("content_type", &self.content_type)
            .field("has_receiver", &self.receiver.is_some())
            .field("has_error_handler", &self.error_handler().is_some())
            .finish()
    }
}

/// Client-owned source of request ids.
///
/// Ids start at 1 and are never reused for the lifetime of the generator.
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reply produced by a transport for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub headers: MultiMap,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First `Content-Type` header value, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get_ignore_case("Content-Type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn method_round_trips_through_str() {
        for m in [
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Options,
            HttpMethod::Head,
            HttpMethod::Patch,
        ] {
            assert_eq!(m.as_str().parse::<HttpMethod>(), Ok(m));
        }
        assert_eq!("option".parse::<HttpMethod>(), Ok(HttpMethod::Options));
        assert!("BREW".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let ids = Arc::new(RequestIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "id {id} handed out twice");
            }
        }
        assert_eq!(seen.len(), 1000);
        assert!(!seen.contains(&0));
    }

    #[test]
    fn reply_content_type_is_case_insensitive() {
        let reply = HttpReply::new(200).with_header("content-type", "application/json");
        assert_eq!(reply.content_type(), Some("application/json"));
    }
}
