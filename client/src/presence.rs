//! Presence — cursor publishing and the remote-cursor map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use wire::{CursorMessage, WireMessage};

use crate::conn::ConnShared;
use crate::session::SessionContext;

/// Most-recent known cursor for one remote user. Overwritten on every
/// arrival; no timestamp comparison, arrival order is authoritative.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteCursor {
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

// =============================================================================
// PUBLISHER
// =============================================================================

/// Converts local pointer movement into outbound cursor messages.
///
/// Sends are best-effort: while the transport is down the update is
/// dropped, never queued or retried — the next pointer move supersedes it.
#[derive(Clone)]
pub struct PresencePublisher {
    ctx: SessionContext,
    shared: Arc<ConnShared>,
    last_cursor: Arc<RwLock<Option<CursorMessage>>>,
}

impl PresencePublisher {
    pub(crate) fn new(ctx: SessionContext, shared: Arc<ConnShared>) -> Self {
        Self { ctx, shared, last_cursor: Arc::new(RwLock::new(None)) }
    }

    /// Publish the local pointer position.
    pub async fn send_cursor(&self, x: f64, y: f64) {
        let cursor = CursorMessage {
            board_id: self.ctx.board_id.clone(),
            user_id: self.ctx.user_id.clone(),
            name: self.ctx.name.clone(),
            color: self.ctx.color.clone(),
            x,
            y,
        };
        *self.last_cursor.write().await = Some(cursor.clone());
        self.try_send(&WireMessage::Cursor(cursor)).await;
    }

    /// Resend the last cursor after a reconnect, re-binding the board
    /// context on the relay and restoring this user's presence for peers.
    pub(crate) async fn announce(&self) {
        let last = self.last_cursor.read().await.clone();
        if let Some(cursor) = last {
            self.try_send(&WireMessage::Cursor(cursor)).await;
        }
    }

    async fn try_send(&self, message: &WireMessage) {
        let outbound = self.shared.outbound.read().await;
        let Some(tx) = outbound.as_ref() else {
            return;
        };
        // Best-effort: a full queue drops the update.
        let _ = tx.try_send(wire::encode_message(message));
    }
}

// =============================================================================
// SUBSCRIBER
// =============================================================================

/// Maintains the live map of remote cursors from inbound messages.
#[derive(Clone)]
pub struct PresenceSubscriber {
    ctx: SessionContext,
    cursors: Arc<RwLock<HashMap<String, RemoteCursor>>>,
}

impl PresenceSubscriber {
    pub(crate) fn new(ctx: SessionContext) -> Self {
        Self { ctx, cursors: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Fold one inbound text frame into the cursor map.
    ///
    /// Non-presence payloads, foreign boards, and the local user's own
    /// echoes are dropped silently; none of these is an error.
    pub async fn on_message(&self, text: &str) {
        let Ok(message) = wire::decode_message(text) else {
            return;
        };

        match message {
            WireMessage::Cursor(cursor) => {
                if cursor.board_id != self.ctx.board_id {
                    return;
                }
                // The local cursor renders from local pointer state, not the
                // echoed broadcast.
                if cursor.user_id == self.ctx.user_id {
                    return;
                }
                self.cursors.write().await.insert(
                    cursor.user_id,
                    RemoteCursor { name: cursor.name, color: cursor.color, x: cursor.x, y: cursor.y },
                );
            }
            WireMessage::Part(part) => {
                if part.board_id != self.ctx.board_id {
                    return;
                }
                self.cursors.write().await.remove(&part.user_id);
            }
        }
    }

    /// Read-only snapshot for the rendering layer.
    pub async fn snapshot(&self) -> HashMap<String, RemoteCursor> {
        self.cursors.read().await.clone()
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
