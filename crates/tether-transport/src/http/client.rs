//! HTTP transport implementation.

use std::error::Error as _;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::{Client, ClientBuilder, Method};
use tokio::net::TcpStream;
use tracing::{debug, info, trace};

use tether_core::{
    Endpoint, HttpMethod, HttpReply, HttpRequest, HttpTransport, MultiMap, ReplyFuture,
    TransportError, TransportResult,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP transport backed by a pooled [`reqwest::Client`].
///
/// `connect` probes the endpoint with a plain TCP connect so a refused port
/// is reported as [`TransportError::ConnectionRefused`]. Requests go through
/// the reqwest pool, sized from [`Endpoint::pool_size`].
pub struct ReqwestTransport {
    client: Client,
    endpoint: Endpoint,
}

impl ReqwestTransport {
    /// Creates a transport for `endpoint`.
    pub fn new(endpoint: Endpoint) -> TransportResult<Self> {
        let mut builder = ClientBuilder::new()
            .connect_timeout(endpoint.connect_timeout)
            .pool_max_idle_per_host(endpoint.pool_size);
        if endpoint.keep_alive {
            builder = builder.tcp_keepalive(KEEP_ALIVE_INTERVAL);
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn connect(&self, endpoint: &Endpoint) -> TransportResult<()> {
        let addr = endpoint.addr();
        debug!(addr = %addr, "Probing endpoint");

        let stream = tokio::time::timeout(endpoint.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::Timeout { addr: addr.clone() })?
            .map_err(|e| io_error(&addr, e))?;
        drop(stream);

        info!(addr = %addr, "Endpoint reachable");
        Ok(())
    }

    fn send(&self, request: Arc<HttpRequest>) -> ReplyFuture {
        let url = self.endpoint.http_url(request.uri());
        let addr = self.endpoint.addr();

        let mut builder = self.client.request(method(request.method()), &url);
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if !request.body().is_empty() {
            builder = builder.body(request.body().to_vec());
        }

        trace!(request_id = request.id(), url = %url, "Dispatching HTTP request");

        async move {
            let response = builder.send().await.map_err(|e| reqwest_error(&addr, e))?;

            let status = response.status().as_u16();
            let mut headers = MultiMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    headers.append(name.as_str(), value);
                }
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| reqwest_error(&addr, e))?;

            trace!(request_id = request.id(), status, len = body.len(), "HTTP reply");
            Ok(HttpReply {
                status,
                headers,
                body: body.to_vec(),
            })
        }
        .boxed()
    }

    async fn close(&self) -> TransportResult<()> {
        // Pooled connections are released when the last client clone drops.
        debug!(addr = %self.endpoint.addr(), "HTTP transport closed");
        Ok(())
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Patch => Method::PATCH,
    }
}

fn io_error(addr: &str, err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused {
            addr: addr.to_string(),
        },
        io::ErrorKind::TimedOut => TransportError::Timeout {
            addr: addr.to_string(),
        },
        _ => TransportError::ConnectionFailed {
            addr: addr.to_string(),
            reason: err.to_string(),
        },
    }
}

fn reqwest_error(addr: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout {
            addr: addr.to_string(),
        };
    }
    if err.is_connect() {
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::ConnectionRefused
            {
                return TransportError::ConnectionRefused {
                    addr: addr.to_string(),
                };
            }
            source = cause.source();
        }
        return TransportError::ConnectionFailed {
            addr: addr.to_string(),
            reason: err.to_string(),
        };
    }
    TransportError::send(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ClientConfig, HttpRequestBuilder};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn endpoint(port: u16) -> Endpoint {
        ClientConfig::new("127.0.0.1", port).endpoint()
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn refused_probe_is_classified() {
        let port = closed_port().await;
        let transport = ReqwestTransport::new(endpoint(port)).unwrap();

        let err = transport.connect(&endpoint(port)).await.unwrap_err();
        assert!(err.is_refused(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn refused_request_is_classified() {
        let port = closed_port().await;
        let transport = ReqwestTransport::new(endpoint(port)).unwrap();

        let request = Arc::new(HttpRequestBuilder::new(1).uri("/status").build());
        let err = transport.send(request).await.unwrap_err();
        assert!(err.is_refused(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn request_round_trips_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).into_owned();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\npong",
                )
                .await
                .unwrap();
            head
        });

        let transport = ReqwestTransport::new(endpoint(port)).unwrap();
        transport.connect(&endpoint(port)).await.unwrap();

        let request = Arc::new(
            HttpRequestBuilder::new(1)
                .uri("/status")
                .param("verbose", "1")
                .header("X-Trace", "abc")
                .build(),
        );
        let reply = transport.send(request).await.unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type(), Some("text/plain"));
        assert_eq!(reply.body, b"pong");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /status?verbose=1 HTTP/1.1"), "{head}");
        assert!(head.to_ascii_lowercase().contains("x-trace: abc"));
    }
}
