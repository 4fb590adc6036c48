//! Owner of the logical connection to the remote endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::retry::{RetryRun, RetryStep};
use super::state::{ConnectionState, StateCell};
use crate::dispatcher::ResponseDispatcher;
use crate::error::TransportResult;
use crate::request::HttpRequest;
use crate::transport::{BoxedHttpTransport, ClientConfig, Endpoint, RetryConfig};

/// Drives the connection state machine, the retry schedule and request
/// hand-off to the HTTP transport.
///
/// Only this type writes the [`ConnectionState`].
pub struct ConnectionManager {
    endpoint: Endpoint,
    retry: RetryConfig,
    transport: BoxedHttpTransport,
    state: StateCell,
    dispatcher: ResponseDispatcher,
    connect_attempts: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager for `config`.
    ///
    /// A zero retry period falls back to the default period.
    pub fn new(config: &ClientConfig, transport: BoxedHttpTransport) -> Self {
        let mut retry = config.retry.clone();
        if retry.period.is_zero() {
            retry.period = RetryConfig::default().period;
            warn!(period = ?retry.period, "Zero retry period, using default");
        }

        Self {
            endpoint: config.endpoint(),
            retry,
            transport,
            state: StateCell::default(),
            dispatcher: ResponseDispatcher::new(),
            connect_attempts: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Number of `connect` calls issued so far.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Marks the connection closed so the next scheduler firing retries it.
    pub fn mark_closed(&self) {
        let prev = self.state.set(ConnectionState::Closed);
        if prev != ConnectionState::Closed {
            warn!(addr = %self.endpoint.addr(), from = %prev, "Connection marked closed");
        }
    }

    /// Attempts to establish the connection and returns the resulting state.
    ///
    /// A refused connection leaves the state `Closed` (retryable). Any other
    /// failure is logged and the state stays `Connecting`.
    pub async fn connect(&self) -> ConnectionState {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
        self.state.set(ConnectionState::Connecting);
        debug!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            timeout = ?self.endpoint.connect_timeout,
            pool_size = self.endpoint.pool_size,
            "Connecting"
        );

        match self.transport.connect(&self.endpoint).await {
            Ok(()) => {
                self.state.set(ConnectionState::Open);
                info!(addr = %self.endpoint.addr(), "Connected");
            }
            Err(e) if e.is_refused() => {
                self.state.set(ConnectionState::Closed);
                warn!(addr = %self.endpoint.addr(), error = %e, "Connection refused");
            }
            Err(e) => {
                error!(
                    host = %self.endpoint.host,
                    port = self.endpoint.port,
                    error = %e,
                    "Unable to connect"
                );
            }
        }
        self.state()
    }

    /// Hands `request` to the transport and delivers the outcome on a
    /// spawned task.
    ///
    /// The request is sent whatever the connection state; a request that
    /// fails during an outage is not resubmitted.
    pub fn send_request(self: &Arc<Self>, request: HttpRequest) -> JoinHandle<()> {
        let request = Arc::new(request);
        let state = self.state();
        if state != ConnectionState::Open {
            debug!(request_id = request.id(), state = %state, "Sending while not open");
        }

        trace!(
            request_id = request.id(),
            method = %request.method(),
            uri = %request.uri(),
            "Sending request"
        );
        let reply = self.transport.send(request.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            match reply.await {
                Ok(reply) => {
                    let _ = this.dispatcher.dispatch(&request, reply);
                }
                Err(e) => {
                    if e.is_refused() {
                        this.mark_closed();
                    }
                    let _ = this.dispatcher.fail(&request, e);
                }
            }
        })
    }

    /// Runs one bounded retry run and returns how it ended.
    ///
    /// Loops only while the state is `Closed`, sleeping one tick per
    /// iteration and dialing on every `reconnect_every`-th iteration.
    pub async fn run_retry(&self) -> RetryStep {
        let mut run = RetryRun::new(&self.retry);

        while self.state.is_closed() {
            tokio::time::sleep(self.retry.tick).await;

            match run.tick(self.state()) {
                RetryStep::Wait => {
                    trace!(attempt = run.attempts(), "Retry backoff");
                }
                RetryStep::Reconnect => {
                    info!(
                        addr = %self.endpoint.addr(),
                        attempt = run.attempts(),
                        "Reconnecting"
                    );
                    self.connect().await;
                }
                RetryStep::Exhausted => {
                    warn!(
                        addr = %self.endpoint.addr(),
                        attempts = self.retry.max_attempts,
                        "Reconnect attempts exhausted until next schedule"
                    );
                    return RetryStep::Exhausted;
                }
                RetryStep::Recovered => return RetryStep::Recovered,
            }
        }
        RetryStep::Recovered
    }

    /// Spawns the periodic retry scheduler; it fires immediately and then
    /// every `retry.period` until `cancel` fires.
    pub fn spawn_retry_scheduler(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.retry.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            step = this.run_retry() => {
                                trace!(outcome = ?step, "Retry run finished");
                            }
                        }
                    }
                }
            }
            debug!("Retry scheduler stopped");
        })
    }

    /// Closes the transport and marks the connection closed.
    pub async fn close(&self) -> TransportResult<()> {
        let result = self.transport.close().await;
        self.state.set(ConnectionState::Closed);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::request::{HttpReply, HttpRequestBuilder};
    use crate::transport::{HttpTransport, ReplyFuture};
    use async_trait::async_trait;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Transport whose connect outcomes are scripted.
    #[derive(Default)]
    struct Scripted {
        outcomes: Mutex<VecDeque<TransportResult<()>>>,
        connects: AtomicU64,
        reply: Mutex<Option<TransportResult<HttpReply>>>,
    }

    impl Scripted {
        fn refusing() -> Self {
            Self::default()
        }

        fn then(self, outcome: TransportResult<()>) -> Self {
            self.outcomes.lock().push_back(outcome);
            self
        }
    }

    fn refused() -> TransportError {
        TransportError::ConnectionRefused {
            addr: "api.example.com:8080".into(),
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn connect(&self, _endpoint: &Endpoint) -> TransportResult<()> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().pop_front().unwrap_or_else(|| Err(refused()))
        }

        fn send(&self, _request: Arc<HttpRequest>) -> ReplyFuture {
            let reply = self
                .reply
                .lock()
                .take()
                .unwrap_or_else(|| Ok(HttpReply::new(200)));
            async move { reply }.boxed()
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn manager(transport: Scripted) -> (Arc<ConnectionManager>, Arc<Scripted>) {
        let transport = Arc::new(transport);
        let config = ClientConfig::new("api.example.com", 8080);
        (
            Arc::new(ConnectionManager::new(&config, transport.clone())),
            transport,
        )
    }

    #[tokio::test]
    async fn connect_outcomes_drive_state() {
        let (mgr, _) = manager(
            Scripted::refusing()
                .then(Ok(()))
                .then(Err(refused()))
                .then(Err(TransportError::Io("tls handshake".into()))),
        );
        assert_eq!(mgr.state(), ConnectionState::Closed);
        assert_eq!(mgr.connect().await, ConnectionState::Open);
        assert_eq!(mgr.connect().await, ConnectionState::Closed);
        assert_eq!(mgr.connect().await, ConnectionState::Connecting);
        assert_eq!(mgr.connect_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_run_dials_three_times_then_gives_up() {
        let (mgr, transport) = manager(Scripted::refusing());
        let started = tokio::time::Instant::now();

        assert_eq!(mgr.run_retry().await, RetryStep::Exhausted);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_after_successful_dial() {
        let (mgr, transport) = manager(Scripted::refusing().then(Ok(())));

        assert_eq!(mgr.run_retry().await, RetryStep::Recovered);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn run_does_nothing_unless_closed() {
        let (mgr, transport) = manager(Scripted::refusing().then(Ok(())));
        mgr.connect().await;

        assert_eq!(mgr.run_retry().await, RetryStep::Recovered);
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_fires_every_period_until_cancelled() {
        let (mgr, transport) = manager(Scripted::refusing());
        let cancel = CancellationToken::new();
        let handle = mgr.spawn_retry_scheduler(cancel.clone());

        // First firing at t=0 spends 11s, the next starts at t=11s.
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
        let after = transport.connects.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), after);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_falls_back_to_default_schedule() {
        let transport = Arc::new(Scripted::refusing());
        let config = ClientConfig::new("api.example.com", 8080).with_retry(RetryConfig {
            period: Duration::ZERO,
            ..RetryConfig::default()
        });
        let mgr = Arc::new(ConnectionManager::new(&config, transport.clone()));
        let cancel = CancellationToken::new();
        let handle = mgr.spawn_retry_scheduler(cancel.clone());

        tokio::time::sleep(Duration::from_millis(12_500)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn refused_request_marks_connection_closed() {
        let transport = Scripted::refusing().then(Ok(()));
        *transport.reply.lock() = Some(Err(refused()));
        let (mgr, _) = manager(transport);
        mgr.connect().await;

        let errors = Arc::new(AtomicU64::new(0));
        let counter = errors.clone();
        let request = HttpRequestBuilder::new(1)
            .text_receiver(|_, _, _| {})
            .error_handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        mgr.send_request(request).await.unwrap();
        assert_eq!(mgr.state(), ConnectionState::Closed);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
