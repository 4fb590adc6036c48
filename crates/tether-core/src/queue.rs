//! Outbound queues and their drain loops.
//!
//! Producers call [`OutboundQueue::enqueue`] from any thread; items gather in
//! a pending batch until [`OutboundQueue::flush`] (or a full batch) hands
//! them to the drain loop. The drain loop runs on its own task and passes
//! each item to a [`QueueListener`] in enqueue order.
//!
//! ```text
//!  producers ──enqueue──▶ pending batch ──flush──▶ channel ──▶ drain loop ──▶ listener
//! ```
//!
//! FIFO holds per queue: the pending batch is moved into the channel while
//! its lock is held, so batches enter the channel in the order their items
//! were enqueued.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{QueueError, QueueResult};
use crate::transport::QueueConfig;

// =============================================================================
// Listener
// =============================================================================

/// Receives the events of one drain loop.
///
/// Only [`receive`](Self::receive) is required; the housekeeping hooks
/// default to doing nothing.
#[async_trait]
pub trait QueueListener<T: Send + 'static>: Send + Sync + 'static {
    /// Handles one item. Items arrive in enqueue order.
    async fn receive(&self, item: T);

    /// Called after a cycle that left nothing buffered.
    fn empty(&self) {}

    /// Called after a cycle that delivered a full batch.
    fn limit(&self) {}

    /// Called once when the drain loop exits.
    fn shutdown(&self) {}

    /// Called when a poll interval passed without any item.
    fn idle(&self) {}
}

/// Listener built from an async closure, for call sites that only care
/// about items.
pub struct FnListener<T, F> {
    f: F,
    _item: PhantomData<fn(T)>,
}

impl<T, F, Fut> FnListener<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> QueueListener<T> for FnListener<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    async fn receive(&self, item: T) {
        (self.f)(item).await;
    }
}

// =============================================================================
// Idle tracking
// =============================================================================

/// Tracks the "last flush" marker refreshed when a queue sits empty.
///
/// Purely housekeeping: it never triggers I/O.
#[derive(Debug)]
pub struct IdleTracker {
    threshold: Duration,
    last_flush: Mutex<Instant>,
}

impl IdleTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_flush: Mutex::new(Instant::now()),
        }
    }

    /// Records an empty observation.
    ///
    /// Returns `true` when more than the threshold had elapsed and the marker
    /// was moved to now.
    pub fn observe_empty(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_flush.lock();
        if now.duration_since(*last) > self.threshold {
            *last = now;
            true
        } else {
            false
        }
    }

    pub fn last_flush(&self) -> Instant {
        *self.last_flush.lock()
    }
}

// =============================================================================
// Queue
// =============================================================================

/// A named FIFO buffer drained by a background task.
pub struct OutboundQueue<T> {
    name: String,
    config: QueueConfig,
    pending: Mutex<Vec<T>>,
    tx: mpsc::UnboundedSender<Vec<T>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<T>>>>,
    stopped: AtomicBool,
    cancel: CancellationToken,
    flushes: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> OutboundQueue<T> {
    /// Creates a stopped-loop queue; call [`start`](Self::start) to drain it.
    pub fn new(name: impl Into<String>, config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            config,
            pending: Mutex::new(Vec::new()),
            tx,
            rx: Mutex::new(Some(rx)),
            stopped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            flushes: AtomicU64::new(0),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an item to the pending batch.
    ///
    /// Never blocks. A batch that reaches the configured size is flushed on
    /// the spot.
    pub fn enqueue(&self, item: T) -> QueueResult<()> {
        if self.is_stopped() {
            return Err(QueueError::Stopped {
                name: self.name.clone(),
            });
        }

        let mut pending = self.pending.lock();
        pending.push(item);
        if pending.len() >= self.config.batch_size.max(1) {
            trace!(queue = %self.name, "Batch full, flushing");
            self.send_batch(&mut pending);
        }
        Ok(())
    }

    /// Hands everything pending to the drain loop now.
    pub fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        let mut pending = self.pending.lock();
        if !pending.is_empty() {
            self.send_batch(&mut pending);
        }
    }

    fn send_batch(&self, pending: &mut Vec<T>) {
        let batch = std::mem::take(pending);
        let len = batch.len();
        if self.tx.send(batch).is_err() {
            debug!(queue = %self.name, dropped = len, "Drain loop gone, batch dropped");
        }
    }

    /// Spawns the drain loop feeding `listener`.
    ///
    /// Must be called from within a Tokio runtime. A queue can be started
    /// once.
    pub fn start<L>(&self, listener: Arc<L>) -> QueueResult<()>
    where
        L: QueueListener<T>,
    {
        let rx = self.rx.lock().take().ok_or_else(|| QueueError::AlreadyStarted {
            name: self.name.clone(),
        })?;

        let handle = tokio::spawn(drain_loop(
            self.name.clone(),
            rx,
            listener,
            self.cancel.clone(),
            self.config.clone(),
        ));
        *self.task.lock() = Some(handle);
        debug!(queue = %self.name, "Drain loop started");
        Ok(())
    }

    /// Stops accepting items and cancels the drain loop. Safe to repeat.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            trace!(queue = %self.name, "Queue already stopped");
            return;
        }
        self.cancel.cancel();
        debug!(queue = %self.name, "Queue stopped");
    }

    /// Waits for the drain loop task to finish.
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of `flush` calls made so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Items waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<T> Drop for OutboundQueue<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drain_loop<T, L>(
    name: String,
    mut rx: mpsc::UnboundedReceiver<Vec<T>>,
    listener: Arc<L>,
    cancel: CancellationToken,
    config: QueueConfig,
) where
    T: Send + 'static,
    L: QueueListener<T>,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            polled = tokio::time::timeout(config.poll_interval, rx.recv()) => {
                match polled {
                    Ok(Some(batch)) => {
                        let full = batch.len() >= config.batch_size;
                        trace!(queue = %name, len = batch.len(), "Draining batch");
                        for item in batch {
                            listener.receive(item).await;
                        }
                        if full {
                            listener.limit();
                        }
                        if rx.is_empty() {
                            listener.empty();
                        }
                    }
                    Ok(None) => break,
                    Err(_) => listener.idle(),
                }
            }
        }
    }

    listener.shutdown();
    debug!(queue = %name, "Drain loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc::UnboundedSender;

    fn queue(batch_size: usize) -> OutboundQueue<u32> {
        OutboundQueue::new(
            "test",
            QueueConfig {
                batch_size,
                poll_interval: Duration::from_millis(10),
            },
        )
    }

    struct Recording {
        items: UnboundedSender<u32>,
        limits: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    impl Recording {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<u32>) {
            let (items, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    items,
                    limits: AtomicUsize::new(0),
                    shutdowns: AtomicUsize::new(0),
                }),
                rx,
            )
        }
    }

    #[async_trait]
    impl QueueListener<u32> for Recording {
        async fn receive(&self, item: u32) {
            let _ = self.items.send(item);
        }

        fn limit(&self) {
            self.limits.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<u32>, n: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let item = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("drain loop stalled")
                .expect("listener dropped");
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn items_stay_buffered_until_flush() {
        let q = queue(100);
        let (listener, mut rx) = Recording::new();
        q.start(listener).unwrap();

        for i in 0..5 {
            q.enqueue(i).unwrap();
        }
        assert_eq!(q.pending_len(), 5);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());

        q.flush();
        assert_eq!(q.pending_len(), 0);
        assert_eq!(collect(&mut rx, 5).await, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn drains_in_enqueue_order_across_batches() {
        let q = queue(7);
        let (listener, mut rx) = Recording::new();
        q.start(listener.clone()).unwrap();

        for i in 0..100 {
            q.enqueue(i).unwrap();
        }
        q.flush();

        assert_eq!(collect(&mut rx, 100).await, (0..100).collect::<Vec<_>>());
        assert_eq!(listener.limits.load(Ordering::SeqCst), 14);
    }

    #[tokio::test]
    async fn concurrent_producers_keep_per_producer_order() {
        let q = Arc::new(queue(3));
        let (listener, mut rx) = Recording::new();
        q.start(listener).unwrap();

        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let q = q.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        q.enqueue(p * 1000 + i).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        q.flush();

        let got = collect(&mut rx, 200).await;
        for p in 0..4u32 {
            let mine: Vec<_> = got.iter().copied().filter(|v| v / 1000 == p).collect();
            assert_eq!(mine, (0..50).map(|i| p * 1000 + i).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn stop_rejects_new_items_and_is_idempotent() {
        let q = queue(10);
        let (listener, _rx) = Recording::new();
        q.start(listener.clone()).unwrap();

        q.stop();
        q.stop();
        q.join().await;

        assert!(q.is_stopped());
        assert_eq!(
            q.enqueue(1),
            Err(QueueError::Stopped {
                name: "test".into()
            })
        );
        assert_eq!(listener.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let q = queue(10);
        q.start(Arc::new(FnListener::new(|_: u32| async {}))).unwrap();
        assert!(matches!(
            q.start(Arc::new(FnListener::new(|_: u32| async {}))),
            Err(QueueError::AlreadyStarted { .. })
        ));
    }

    #[tokio::test]
    async fn flush_is_counted_even_when_nothing_is_pending() {
        let q = queue(10);
        q.flush();
        q.flush();
        assert_eq!(q.flush_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_marker_moves_only_after_threshold() {
        let tracker = IdleTracker::new(Duration::from_millis(3000));
        let start = tracker.last_flush();

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(!tracker.observe_empty());
        assert_eq!(tracker.last_flush(), start);

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(tracker.observe_empty());
        assert!(tracker.last_flush() > start);
    }
}
