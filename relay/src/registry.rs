//! Connection registry — the set of live transport connections.
//!
//! DESIGN
//! ======
//! One entry per websocket connection, keyed by an opaque id minted at
//! upgrade time. Each entry holds the sender half of the connection's
//! outbound channel, its liveness flag, and the board/user identifiers
//! last observed on its traffic. The registry knows nothing about message
//! semantics; the hub and the heartbeat monitor are its only writers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::error;
use uuid::Uuid;

/// Commands delivered to a connection's websocket task through its channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame to forward to the peer.
    Text(String),
    /// A liveness probe; the peer answers with a pong.
    Ping,
    /// Close the transport and end the connection task.
    Close,
}

/// Per-connection bookkeeping.
pub struct ConnectionHandle {
    /// Sender for outgoing commands; the websocket task drains the other end.
    pub tx: mpsc::Sender<Outbound>,
    /// Lowered before each probe round, raised by an inbound pong. A
    /// connection found lowered at the next round is evicted.
    pub alive: bool,
    /// Board last observed on this connection's traffic.
    pub board_id: Option<String>,
    /// User last observed on this connection's traffic.
    pub user_id: Option<String>,
}

/// Registry of live connections. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { connections: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Add a connection with its liveness flag raised.
    ///
    /// The transport layer mints fresh ids, so a duplicate means a broken
    /// invariant upstream; the stale entry is logged and replaced.
    pub async fn register(&self, conn_id: Uuid, tx: mpsc::Sender<Outbound>) {
        let handle = ConnectionHandle { tx, alive: true, board_id: None, user_id: None };
        let mut connections = self.connections.write().await;
        if connections.insert(conn_id, handle).is_some() {
            error!(%conn_id, "duplicate connection id registered; replacing stale entry");
        }
    }

    /// Remove a connection and return its handle. Idempotent: removing an
    /// absent id returns `None` and is not an error.
    pub async fn unregister(&self, conn_id: Uuid) -> Option<ConnectionHandle> {
        self.connections.write().await.remove(&conn_id)
    }

    /// Raise the liveness flag in response to a probe acknowledgment.
    pub async fn mark_alive(&self, conn_id: Uuid) {
        if let Some(handle) = self.connections.write().await.get_mut(&conn_id) {
            handle.alive = true;
        }
    }

    /// Record the board/user identifiers observed on a connection's traffic.
    /// Absent fields leave the previous observation in place.
    pub async fn note_context(&self, conn_id: Uuid, board_id: Option<&str>, user_id: Option<&str>) {
        if board_id.is_none() && user_id.is_none() {
            return;
        }
        let mut connections = self.connections.write().await;
        let Some(handle) = connections.get_mut(&conn_id) else {
            return;
        };
        if let Some(board_id) = board_id {
            handle.board_id = Some(board_id.to_owned());
        }
        if let Some(user_id) = user_id {
            handle.user_id = Some(user_id.to_owned());
        }
    }

    /// Invoke `f` for every registered connection other than `exclude`.
    /// With `board` set, only connections last seen on that board are
    /// visited. Failures inside `f` are the caller's to log; iteration
    /// never stops early.
    pub async fn for_each_except(
        &self,
        exclude: Uuid,
        board: Option<&str>,
        mut f: impl FnMut(Uuid, &ConnectionHandle),
    ) {
        let connections = self.connections.read().await;
        for (conn_id, handle) in connections.iter() {
            if *conn_id == exclude {
                continue;
            }
            if let Some(board) = board {
                if handle.board_id.as_deref() != Some(board) {
                    continue;
                }
            }
            f(*conn_id, handle);
        }
    }

    /// Remove and return every connection whose liveness flag is lowered,
    /// i.e. that did not acknowledge the previous probe.
    pub async fn evict_unresponsive(&self) -> Vec<(Uuid, ConnectionHandle)> {
        let mut connections = self.connections.write().await;
        let dead: Vec<Uuid> = connections
            .iter()
            .filter(|(_, handle)| !handle.alive)
            .map(|(conn_id, _)| *conn_id)
            .collect();

        dead.into_iter()
            .filter_map(|conn_id| connections.remove(&conn_id).map(|handle| (conn_id, handle)))
            .collect()
    }

    /// Lower every liveness flag and return the senders to probe.
    pub async fn clear_liveness(&self) -> Vec<(Uuid, mpsc::Sender<Outbound>)> {
        let mut connections = self.connections.write().await;
        connections
            .iter_mut()
            .map(|(conn_id, handle)| {
                handle.alive = false;
                (*conn_id, handle.tx.clone())
            })
            .collect()
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
