//! Fluent construction of [`HttpRequest`] values.

use std::sync::Arc;
use std::time::SystemTime;

use super::multimap::MultiMap;
use super::receiver::{
    BinaryReceiver, BoxedReceiver, ErrorHandler, TextReceiver, WithErrorHandler,
};
use super::{HttpMethod, HttpRequest};
use crate::error::TransportError;

/// Content type used by the JSON body helpers.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=\"UTF-8\"";

/// Content type set when query parameters are moved into a POST/PUT body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Builder for [`HttpRequest`].
///
/// The id is required up front. Use
/// [`QueuedClient::request`](crate::QueuedClient::request) to get one from
/// the client's counter.
///
/// ```rust,ignore
/// let request = client
///     .request("/users")
///     .param("page", "2")
///     .text_receiver(|status, _, body| println!("{status}: {body}"))
///     .build();
/// client.send_http_request(request)?;
/// ```
#[must_use]
pub struct HttpRequestBuilder {
    id: u64,
    uri: String,
    method: HttpMethod,
    params: MultiMap,
    headers: MultiMap,
    body: Vec<u8>,
    remote_address: Option<String>,
    content_type: Option<String>,
    receiver: Option<BoxedReceiver>,
    error_handler: Option<ErrorHandler>,
    timestamp: Option<SystemTime>,
}

impl HttpRequestBuilder {
    /// Creates a GET builder for `/` with the given id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            uri: "/".to_string(),
            method: HttpMethod::Get,
            params: MultiMap::new(),
            headers: MultiMap::new(),
            body: Vec::new(),
            remote_address: None,
            content_type: None,
            receiver: None,
            error_handler: None,
            timestamp: None,
        }
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn get(self) -> Self {
        self.method(HttpMethod::Get)
    }

    pub fn post(self) -> Self {
        self.method(HttpMethod::Post)
    }

    pub fn put(self) -> Self {
        self.method(HttpMethod::Put)
    }

    pub fn delete(self) -> Self {
        self.method(HttpMethod::Delete)
    }

    pub fn options(self) -> Self {
        self.method(HttpMethod::Options)
    }

    pub fn head(self) -> Self {
        self.method(HttpMethod::Head)
    }

    /// Appends a header; repeated names are kept.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends a query parameter; repeated names are kept.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn json_content_type(self) -> Self {
        self.content_type(JSON_CONTENT_TYPE)
    }

    /// Sets a JSON body and switches the method to POST.
    pub fn json_body_for_post(self, json: impl Into<String>) -> Self {
        self.json_content_type()
            .body(json.into().into_bytes())
            .post()
    }

    /// Sets a JSON body and switches the method to PUT.
    pub fn json_body_for_put(self, json: impl Into<String>) -> Self {
        self.json_content_type().body(json.into().into_bytes()).put()
    }

    pub fn remote_address(mut self, addr: impl Into<String>) -> Self {
        self.remote_address = Some(addr.into());
        self
    }

    /// Overrides the creation timestamp (defaults to the build time).
    pub fn timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn receiver(mut self, receiver: BoxedReceiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Receives the body decoded as text.
    pub fn text_receiver<F>(self, f: F) -> Self
    where
        F: Fn(u16, Option<&str>, String) + Send + Sync + 'static,
    {
        self.receiver(Arc::new(TextReceiver::new(f)))
    }

    /// Receives the raw body bytes.
    pub fn binary_receiver<F>(self, f: F) -> Self
    where
        F: Fn(u16, Option<&str>, Vec<u8>) + Send + Sync + 'static,
    {
        self.receiver(Arc::new(BinaryReceiver::new(f)))
    }

    /// Handler for transport failures; composed into the receiver on build.
    pub fn error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(f));
        self
    }

    /// Finishes the request.
    ///
    /// Query parameters go into the URI for GET/OPTIONS/HEAD/DELETE and
    /// become a form-encoded body for POST/PUT. A configured content type is
    /// also emitted as a `Content-Type` header.
    pub fn build(self) -> HttpRequest {
        let Self {
            id,
            mut uri,
            method,
            params,
            mut headers,
            mut body,
            remote_address,
            mut content_type,
            receiver,
            error_handler,
            timestamp,
        } = self;

        if !params.is_empty() {
            let query = params.to_query_string();
            if method.params_in_uri() {
                uri.push(if uri.contains('?') { '&' } else { '?' });
                uri.push_str(&query);
            } else if matches!(method, HttpMethod::Post | HttpMethod::Put) {
                body = query.into_bytes();
                content_type = Some(FORM_CONTENT_TYPE.to_string());
            }
        }

        // Never invent a receiver: the dispatcher reports its absence. The
        // error handler is kept on the request either way.
        let receiver = match (receiver, &error_handler) {
            (Some(inner), Some(on_error)) => Some(
                Arc::new(WithErrorHandler::new(inner, Arc::clone(on_error))) as BoxedReceiver,
            ),
            (receiver, _) => receiver,
        };

        if let Some(ct) = &content_type {
            headers.append("Content-Type", ct.clone());
        }

        HttpRequest {
            id,
            uri,
            method,
            params,
            headers,
            body,
            remote_address,
            content_type,
            receiver,
            error_handler,
            timestamp: timestamp.unwrap_or_else(SystemTime::now),
        }
    }
}
