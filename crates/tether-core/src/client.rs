//! The queued client: caller-facing entry point tying the queues, the
//! connection manager and the session table together.
//!
//! ```text
//!  send_http_request ──▶ request queue ──drain──▶ ConnectionManager ──▶ HttpTransport
//!  send_socket_message ─▶ socket queue ──drain──▶ SessionTable ──────▶ SocketConnector
//! ```
//!
//! Every caller-facing call is synchronous and non-blocking. Replies come
//! back through the receivers attached to each request, on whatever task
//! the transport completes them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{ClientError, ClientResult};
use crate::message::SocketMessage;
use crate::queue::{IdleTracker, OutboundQueue, QueueListener};
use crate::request::{HttpRequest, HttpRequestBuilder, RequestIdGenerator};
use crate::session::SessionTable;
use crate::transport::{BoxedConnector, BoxedHttpTransport, ClientConfig};

// =============================================================================
// Drain listeners
// =============================================================================

struct RequestForwarder {
    manager: Arc<ConnectionManager>,
    idle: IdleTracker,
}

impl RequestForwarder {
    fn observe_empty(&self) {
        if self.idle.observe_empty() {
            trace!("Request queue quiet, idle marker refreshed");
        }
    }
}

#[async_trait]
impl QueueListener<HttpRequest> for RequestForwarder {
    async fn receive(&self, request: HttpRequest) {
        self.manager.send_request(request);
    }

    fn empty(&self) {
        self.observe_empty();
    }

    fn idle(&self) {
        self.observe_empty();
    }
}

struct MessageForwarder {
    sessions: Arc<SessionTable>,
}

#[async_trait]
impl QueueListener<SocketMessage> for MessageForwarder {
    async fn receive(&self, message: SocketMessage) {
        let uri = message.uri().to_string();
        if let Err(e) = self.sessions.send(message).await {
            warn!(uri = %uri, error = %e, "Socket message not delivered");
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Asynchronous client multiplexing HTTP requests and socket sessions to one
/// endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let client = QueuedClient::new(config, http_transport, socket_connector);
/// client.start().await?;
///
/// let request = client
///     .request("/status")
///     .text_receiver(|status, _, body| println!("{status}: {body}"))
///     .build();
/// client.send_http_request(request)?;
///
/// client.stop().await;
/// ```
pub struct QueuedClient {
    config: ClientConfig,
    ids: RequestIdGenerator,
    manager: Arc<ConnectionManager>,
    sessions: Arc<SessionTable>,
    request_queue: OutboundQueue<HttpRequest>,
    socket_queue: OutboundQueue<SocketMessage>,
    cancel: CancellationToken,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl QueuedClient {
    /// Creates a client bound to the given transports. Nothing runs until
    /// [`start`](Self::start); items enqueued before then stay buffered.
    pub fn new(
        config: ClientConfig,
        transport: BoxedHttpTransport,
        connector: BoxedConnector,
    ) -> Self {
        let addr = format!("{}:{}", config.host, config.port);
        let manager = Arc::new(ConnectionManager::new(&config, transport));
        let sessions = Arc::new(SessionTable::new(config.endpoint(), connector));

        Self {
            request_queue: OutboundQueue::new(
                format!("HTTP request queue {addr}"),
                config.request_queue.clone(),
            ),
            socket_queue: OutboundQueue::new(
                format!("WebSocket queue {addr}"),
                config.socket_queue.clone(),
            ),
            config,
            ids: RequestIdGenerator::new(),
            manager,
            sessions,
            cancel: CancellationToken::new(),
            scheduler: Mutex::new(None),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Starts a request builder with a fresh id from this client.
    pub fn request(&self, uri: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(self.ids.next_id()).uri(uri)
    }

    /// Returns a fresh request id.
    pub fn next_request_id(&self) -> u64 {
        self.ids.next_id()
    }

    /// Starts both drain loops, makes the initial connection attempt and
    /// starts the retry scheduler.
    ///
    /// Must be called from within a Tokio runtime. Calling it again is a
    /// no-op.
    pub async fn start(&self) -> ClientResult<()> {
        if self.is_stopped() {
            return Err(ClientError::Stopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Client already started");
            return Ok(());
        }

        info!(
            host = %self.config.host,
            port = self.config.port,
            auto_flush = self.config.auto_flush,
            "Starting client"
        );

        self.socket_queue.start(Arc::new(MessageForwarder {
            sessions: Arc::clone(&self.sessions),
        }))?;
        self.request_queue.start(Arc::new(RequestForwarder {
            manager: Arc::clone(&self.manager),
            idle: IdleTracker::new(self.config.idle_threshold),
        }))?;

        self.manager.connect().await;

        let handle = self.manager.spawn_retry_scheduler(self.cancel.child_token());
        *self.scheduler.lock() = Some(handle);
        Ok(())
    }

    /// Queues an HTTP request; flushes immediately when auto-flush is on.
    pub fn send_http_request(&self, request: HttpRequest) -> ClientResult<()> {
        if self.is_stopped() {
            return Err(ClientError::Stopped);
        }
        trace!(request_id = request.id(), uri = %request.uri(), "Queueing request");
        self.request_queue.enqueue(request)?;
        if self.config.auto_flush {
            self.request_queue.flush();
        }
        Ok(())
    }

    /// Queues a socket message; flushes immediately when auto-flush is on.
    pub fn send_socket_message(&self, message: SocketMessage) -> ClientResult<()> {
        if self.is_stopped() {
            return Err(ClientError::Stopped);
        }
        trace!(uri = %message.uri(), "Queueing socket message");
        self.socket_queue.enqueue(message)?;
        if self.config.auto_flush {
            self.socket_queue.flush();
        }
        Ok(())
    }

    /// Forces both queues to hand their pending items to the drain loops.
    pub fn flush(&self) {
        self.request_queue.flush();
        self.socket_queue.flush();
    }

    /// Shuts the client down.
    ///
    /// Cancels the retry scheduler, stops both queues and closes the
    /// transport and cached sessions. Each step runs even if another fails.
    /// Safe to call more than once.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Client already stopped");
            return;
        }
        info!(host = %self.config.host, port = self.config.port, "Stopping client");

        self.cancel.cancel();
        let scheduler = self.scheduler.lock().take();
        if let Some(handle) = scheduler
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Problem shutting down retry scheduler");
        }

        self.request_queue.stop();
        self.socket_queue.stop();

        self.sessions.close_all();
        if let Err(e) = self.manager.close().await {
            warn!(error = %e, "Problem closing transport");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    pub fn request_queue(&self) -> &OutboundQueue<HttpRequest> {
        &self.request_queue
    }

    pub fn socket_queue(&self) -> &OutboundQueue<SocketMessage> {
        &self.socket_queue
    }
}

impl Drop for QueuedClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportResult};
    use crate::request::{HttpMethod, HttpReply};
    use crate::transport::{
        BoxedSession, Endpoint, HttpTransport, ReplyFuture, SessionHandlers, SocketConnector,
        SocketSession,
    };
    use futures::FutureExt;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Recorder {
        refuse_connect: bool,
        connects: AtomicU64,
        sent: mpsc::UnboundedSender<Arc<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Recorder {
        async fn connect(&self, endpoint: &Endpoint) -> TransportResult<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse_connect {
                Err(TransportError::ConnectionRefused {
                    addr: endpoint.addr(),
                })
            } else {
                Ok(())
            }
        }

        fn send(&self, request: Arc<HttpRequest>) -> ReplyFuture {
            let _ = self.sent.send(request);
            async { Ok(HttpReply::new(200).with_body("ok")) }.boxed()
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    struct NullSession;

    impl SocketSession for NullSession {
        fn write_text(&self, _text: &str) -> TransportResult<()> {
            Ok(())
        }

        fn close(&self) {}
    }

    #[derive(Default)]
    struct CountingConnector {
        opened: AtomicU64,
    }

    #[async_trait]
    impl SocketConnector for CountingConnector {
        async fn open(
            &self,
            _endpoint: &Endpoint,
            _uri: &str,
            _handlers: SessionHandlers,
        ) -> TransportResult<BoxedSession> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullSession))
        }
    }

    struct Harness {
        client: QueuedClient,
        transport: Arc<Recorder>,
        connector: Arc<CountingConnector>,
        sent: mpsc::UnboundedReceiver<Arc<HttpRequest>>,
    }

    fn harness(config: ClientConfig, refuse_connect: bool) -> Harness {
        let (tx, sent) = mpsc::unbounded_channel();
        let transport = Arc::new(Recorder {
            refuse_connect,
            connects: AtomicU64::new(0),
            sent: tx,
        });
        let connector = Arc::new(CountingConnector::default());
        let client = QueuedClient::new(config, transport.clone(), connector.clone());
        Harness {
            client,
            transport,
            connector,
            sent,
        }
    }

    async fn next_sent(h: &mut Harness) -> Arc<HttpRequest> {
        tokio::time::timeout(Duration::from_secs(5), h.sent.recv())
            .await
            .expect("request not sent in time")
            .expect("transport dropped")
    }

    #[tokio::test]
    async fn status_request_reaches_transport_once() {
        let mut h = harness(ClientConfig::new("api.example.com", 8080), false);
        h.client.start().await.unwrap();
        assert_eq!(h.client.state(), ConnectionState::Open);

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        let request = h
            .client
            .request("/status")
            .get()
            .text_receiver(move |status, _, body| {
                let _ = reply_tx.send((status, body));
            })
            .build();
        h.client.send_http_request(request).unwrap();

        let sent = next_sent(&mut h).await;
        assert_eq!(sent.method(), HttpMethod::Get);
        assert_eq!(sent.uri(), "/status");
        assert!(sent.body().is_empty());
        assert_eq!(reply_rx.recv().await, Some((200, "ok".to_string())));

        h.client.stop().await;
        assert!(h.sent.try_recv().is_err());
    }

    #[tokio::test]
    async fn requests_reach_transport_in_submission_order() {
        let mut h = harness(ClientConfig::new("api.example.com", 8080), false);
        h.client.start().await.unwrap();

        let ids: Vec<u64> = (0..100)
            .map(|_| {
                let request = h.client.request("/items").build();
                let id = request.id();
                h.client.send_http_request(request).unwrap();
                id
            })
            .collect();

        let mut seen = Vec::new();
        for _ in 0..ids.len() {
            seen.push(next_sent(&mut h).await.id());
        }
        assert_eq!(seen, ids);
        assert_eq!(h.client.request_queue().flush_count(), 100);
        h.client.stop().await;
    }

    #[tokio::test]
    async fn manual_flush_when_auto_flush_is_off() {
        let mut h = harness(
            ClientConfig::new("api.example.com", 8080).with_auto_flush(false),
            false,
        );
        h.client.start().await.unwrap();

        for _ in 0..3 {
            let request = h.client.request("/later").build();
            h.client.send_http_request(request).unwrap();
        }
        assert_eq!(h.client.request_queue().pending_len(), 3);
        assert_eq!(h.client.request_queue().flush_count(), 0);

        h.client.flush();
        assert_eq!(h.client.request_queue().pending_len(), 0);
        for _ in 0..3 {
            next_sent(&mut h).await;
        }
        h.client.stop().await;
    }

    #[tokio::test]
    async fn socket_messages_share_one_session_per_uri() {
        let h = harness(ClientConfig::new("api.example.com", 8080), false);
        h.client.start().await.unwrap();

        h.client
            .send_socket_message(SocketMessage::new("/chat", "one", |_| {}))
            .unwrap();
        h.client
            .send_socket_message(SocketMessage::new("/chat", "two", |_| {}))
            .unwrap();
        h.client
            .send_socket_message(SocketMessage::new("/news", "three", |_| {}))
            .unwrap();

        for _ in 0..100 {
            if h.client.sessions().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.client.sessions().len(), 2);
        assert_eq!(h.connector.opened.load(Ordering::SeqCst), 2);
        h.client.stop().await;
        assert!(h.client.sessions().is_empty());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_rejects_new_work() {
        let h = harness(ClientConfig::new("api.example.com", 8080), false);
        h.client.start().await.unwrap();

        h.client.stop().await;
        assert!(h.client.request_queue().is_stopped());
        assert!(h.client.socket_queue().is_stopped());
        assert_eq!(h.client.state(), ConnectionState::Closed);

        h.client.stop().await;
        assert!(h.client.is_stopped());

        let request = h.client.request("/late").build();
        assert!(matches!(
            h.client.send_http_request(request),
            Err(ClientError::Stopped)
        ));
        assert!(matches!(
            h.client
                .send_socket_message(SocketMessage::new("/chat", "x", |_| {})),
            Err(ClientError::Stopped)
        ));
        assert!(matches!(h.client.start().await, Err(ClientError::Stopped)));
    }

    #[tokio::test]
    async fn stop_without_start_is_clean() {
        let h = harness(ClientConfig::new("api.example.com", 8080), false);
        h.client.stop().await;
        assert!(h.client.request_queue().is_stopped());
        assert_eq!(h.transport.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_start_is_retried_by_the_scheduler() {
        let h = harness(ClientConfig::new("api.example.com", 8080), true);
        h.client.start().await.unwrap();
        assert_eq!(h.client.state(), ConnectionState::Closed);
        assert_eq!(h.transport.connects.load(Ordering::SeqCst), 1);

        // The first run dials on its third tick.
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(h.transport.connects.load(Ordering::SeqCst), 2);

        h.client.stop().await;
        let after = h.transport.connects.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.transport.connects.load(Ordering::SeqCst), after);
    }

    /// Refuses the first dial, panics on every later one and fails to close.
    #[derive(Default)]
    struct Brittle {
        connects: AtomicU64,
    }

    #[async_trait]
    impl HttpTransport for Brittle {
        async fn connect(&self, endpoint: &Endpoint) -> TransportResult<()> {
            if self.connects.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(TransportError::ConnectionRefused {
                    addr: endpoint.addr(),
                });
            }
            panic!("dialer crashed");
        }

        fn send(&self, _request: Arc<HttpRequest>) -> ReplyFuture {
            async { Ok(HttpReply::new(200)) }.boxed()
        }

        async fn close(&self) -> TransportResult<()> {
            Err(TransportError::closed("pool already torn down"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_shutdown_steps_do_not_block_the_rest() {
        let transport = Arc::new(Brittle::default());
        let client = QueuedClient::new(
            ClientConfig::new("api.example.com", 8080),
            transport.clone(),
            Arc::new(CountingConnector::default()),
        );
        client.start().await.unwrap();
        client
            .send_socket_message(SocketMessage::new("/chat", "hi", |_| {}))
            .unwrap();

        // The scheduler's first reconnect panics and takes its task down.
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(client.sessions().len(), 1);

        client.stop().await;
        assert!(client.is_stopped());
        assert!(client.request_queue().is_stopped());
        assert!(client.socket_queue().is_stopped());
        assert!(client.sessions().is_empty());
        assert_eq!(client.state(), ConnectionState::Closed);
    }
}
