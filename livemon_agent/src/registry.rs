//! Live sessions keyed by id. Each entry pairs the session state with the
//! outbox drained by that connection's socket writer.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::trace;

use crate::proto::ServerMessage;
use crate::session::{Session, SharedSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn from_raw(raw: u64) -> Self {
        SessionId(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Messages queued per connection before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 16;

pub type Outbox = mpsc::Sender<ServerMessage>;

pub fn outbox() -> (Outbox, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

#[derive(Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub session: SharedSession,
    outbox: Outbox,
}

impl SessionHandle {
    /// Open while the connection's writer still holds the receiving end.
    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }

    /// Best effort: a message for a connection that went away, or whose
    /// reader has fallen a full queue behind, is dropped.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.outbox.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(session = %self.id, "outbox full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id, insert a fresh session and return its state handle.
    /// The registry keeps the outbox; the caller keeps the receiver.
    pub async fn register(&self, outbox: Outbox) -> (SessionId, SharedSession) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let session = Arc::new(Mutex::new(Session::new(id)));
        let handle = SessionHandle {
            id,
            session: session.clone(),
            outbox,
        };
        self.sessions.write().await.insert(id, handle);
        (id, session)
    }

    /// Remove a session; returns whether it was present.
    pub async fn unregister(&self, id: SessionId) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Point-in-time copy of the membership. The lock is released before
    /// the caller touches any entry.
    pub async fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&SessionHandle),
    {
        for handle in self.snapshot().await {
            visit(&handle);
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every entry. Once the last outbox clone is gone each writer
    /// ends its connection.
    pub async fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let closed = sessions.len();
        sessions.clear();
        closed
    }
}
