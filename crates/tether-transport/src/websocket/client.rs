//! WebSocket connector implementation.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use tether_core::{
    BoxedSession, Endpoint, SessionHandlers, SocketConnector, SocketSession, TransportError,
    TransportResult,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

enum Outbound {
    Text(String),
    Close,
}

/// Opens WebSocket sessions with tokio-tungstenite.
///
/// Each session runs on its own task. Writes are queued to that task, so
/// [`SocketSession::write_text`] never blocks; it fails once the task has
/// ended.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn open(
        &self,
        endpoint: &Endpoint,
        uri: &str,
        handlers: SessionHandlers,
    ) -> TransportResult<BoxedSession> {
        let url = endpoint.ws_url(uri);
        let addr = endpoint.addr();

        debug!(url = %url, "Opening WebSocket session");
        let (stream, _response) = tokio::time::timeout(endpoint.connect_timeout, connect_async(&url))
            .await
            .map_err(|_| TransportError::Timeout { addr: addr.clone() })?
            .map_err(|e| ws_error(&addr, e))?;
        info!(url = %url, "WebSocket session open");

        let (sink, source) = stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(sink, source, rx, handlers, url));

        Ok(Arc::new(WsSession { outbound: tx }))
    }
}

struct WsSession {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl SocketSession for WsSession {
    fn write_text(&self, text: &str) -> TransportResult<()> {
        self.outbound
            .send(Outbound::Text(text.to_string()))
            .map_err(|_| TransportError::closed("session ended"))
    }

    fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Pumps one session until either side closes it, then fires `on_close`.
async fn run_session(
    mut sink: WsSink,
    mut source: WsSource,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    handlers: SessionHandlers,
    url: String,
) {
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!(url = %url, error = %e, "Failed to send frame");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!(url = %url, "Closing WebSocket session");
                    let _ = sink.close().await;
                    break;
                }
            },

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(url = %url, len = text.len(), "Received text");
                    (handlers.on_frame)(text.as_str().to_owned());
                }
                Some(Ok(Message::Binary(data))) => {
                    trace!(url = %url, len = data.len(), "Received binary");
                    (handlers.on_frame)(String::from_utf8_lossy(&data).into_owned());
                }
                Some(Ok(Message::Ping(data))) => {
                    trace!(url = %url, "Received ping, sending pong");
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    info!(url = %url, "Server closed session");
                    break;
                }
                Some(Err(e)) => {
                    warn!(url = %url, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    outbound.close();
    (handlers.on_close)();
}

fn ws_error(addr: &str, err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            TransportError::ConnectionRefused {
                addr: addr.to_string(),
            }
        }
        other => TransportError::ConnectionFailed {
            addr: addr.to_string(),
            reason: format!("WebSocket connection failed: {other}"),
        },
    }
}
