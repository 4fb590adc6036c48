//! Delivery of replies and failures to the request that caused them.
//!
//! Correlation is direct: the task awaiting a reply holds the originating
//! [`HttpRequest`], so there is no lookup table keyed by request id. Each
//! reply is delivered on its own; ordering between replies follows the
//! transport.

use tracing::{debug, warn};

use crate::error::{DispatchError, DispatchResult, TransportError};
use crate::request::{HttpReply, HttpRequest, ResponseBody};

/// Hands replies and per-request failures to response receivers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseDispatcher;

impl ResponseDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Delivers `reply` to the receiver of `request`.
    ///
    /// The receiver gets the status, the first `Content-Type` header and the
    /// body, plus the full header set through
    /// [`response_with_headers`](crate::ResponseReceiver::response_with_headers).
    pub fn dispatch(&self, request: &HttpRequest, reply: HttpReply) -> DispatchResult<()> {
        let Some(receiver) = request.receiver() else {
            warn!(
                request_id = request.id(),
                uri = %request.uri(),
                status = reply.status,
                "Reply for request without a response receiver"
            );
            return Err(DispatchError::NoReceiver {
                request_id: request.id(),
            });
        };

        debug!(
            request_id = request.id(),
            status = reply.status,
            len = reply.body.len(),
            "Dispatching reply"
        );

        let HttpReply {
            status,
            headers,
            body,
        } = reply;
        let content_type = headers.get_ignore_case("Content-Type");
        let body = ResponseBody::from_bytes(body, receiver.is_text());
        receiver.response_with_headers(status, content_type, body, &headers);
        Ok(())
    }

    /// Routes a transport failure to the request's error handler.
    pub fn fail(&self, request: &HttpRequest, error: TransportError) -> DispatchResult<()> {
        match request.error_handler() {
            Some(handler) => {
                debug!(request_id = request.id(), error = %error, "Delivering request failure");
                handler(&error);
                Ok(())
            }
            None => {
                warn!(
                    request_id = request.id(),
                    uri = %request.uri(),
                    error = %error,
                    "Request failed with no error handler"
                );
                Err(DispatchError::Unhandled {
                    request_id: request.id(),
                    error,
                })
            }
        }
    }
}
