//! Per-URI cache of live socket sessions.
//!
//! The first message for a URI opens a session; later messages reuse it
//! until the peer closes it. Inbound frames are routed to the sender of the
//! message that opened the session.
//!
//! # Concurrency
//!
//! The table is a [`DashMap`], written from the socket drain loop (inserts)
//! and from transport tasks (close-driven evictions). Each entry remembers
//! the id of the session it holds and a close only evicts its own entry, so
//! a late close from a replaced session never drops its successor.
//!
//! Two concurrent first sends to the same URI may both miss the cache and
//! both open a session. The last insert wins and the replaced session is
//! closed. There is no lock around establishment; the client's single drain
//! loop keeps this from happening in normal use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::error::TransportResult;
use crate::message::SocketMessage;
use crate::transport::{BoxedConnector, BoxedSession, Endpoint, SessionHandlers};

struct SessionEntry {
    id: u64,
    session: BoxedSession,
}

type SessionMap = DashMap<String, SessionEntry>;

/// Caches one live session per target URI.
pub struct SessionTable {
    endpoint: Endpoint,
    connector: BoxedConnector,
    sessions: Arc<SessionMap>,
    next_id: AtomicU64,
    opened: AtomicU64,
}

impl SessionTable {
    pub fn new(endpoint: Endpoint, connector: BoxedConnector) -> Self {
        Self {
            endpoint,
            connector,
            sessions: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            opened: AtomicU64::new(0),
        }
    }

    /// Writes `message` to the session for its URI, opening one if needed.
    ///
    /// A write that fails on a cached session is treated as a stale entry
    /// and retried once on a freshly opened session.
    pub async fn send(&self, message: SocketMessage) -> TransportResult<()> {
        let cached = self
            .sessions
            .get(message.uri())
            .map(|entry| Arc::clone(&entry.session));

        if let Some(session) = cached {
            match session.write_text(message.message()) {
                Ok(()) => {
                    trace!(uri = %message.uri(), "Wrote to cached session");
                    return Ok(());
                }
                Err(e) => {
                    debug!(uri = %message.uri(), error = %e, "Cached session is stale, reopening");
                }
            }
        }

        self.connect_and_send(message).await
    }

    async fn connect_and_send(&self, message: SocketMessage) -> TransportResult<()> {
        let uri = message.uri().to_string();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let handlers = SessionHandlers {
            on_frame: Arc::clone(message.sender()),
            on_close: evict_on_close(Arc::downgrade(&self.sessions), uri.clone(), id),
        };

        debug!(uri = %uri, session_id = id, "Opening session");
        let session = self.connector.open(&self.endpoint, &uri, handlers).await?;
        self.opened.fetch_add(1, Ordering::Relaxed);

        let replaced = self.sessions.insert(
            uri.clone(),
            SessionEntry {
                id,
                session: Arc::clone(&session),
            },
        );
        if let Some(prev) = replaced {
            debug!(uri = %uri, replaced = prev.id, session_id = id, "Replaced cached session");
            prev.session.close();
        }

        session.write_text(message.message())
    }

    /// Whether a session is cached for `uri`.
    pub fn contains(&self, uri: &str) -> bool {
        self.sessions.contains_key(uri)
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions opened over the table's lifetime.
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Closes and forgets every cached session.
    pub fn close_all(&self) {
        let uris: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for uri in uris {
            if let Some((_, entry)) = self.sessions.remove(&uri) {
                trace!(uri = %uri, session_id = entry.id, "Closing session");
                entry.session.close();
            }
        }
    }
}

fn evict_on_close(
    sessions: Weak<SessionMap>,
    uri: String,
    id: u64,
) -> crate::transport::CloseHandler {
    Arc::new(move || {
        let Some(sessions) = sessions.upgrade() else {
            return;
        };
        if sessions.remove_if(&uri, |_, entry| entry.id == id).is_some() {
            debug!(uri = %uri, session_id = id, "Session closed, evicted");
        } else {
            trace!(uri = %uri, session_id = id, "Close for a session that is no longer cached");
        }
    })
}
