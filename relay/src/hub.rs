//! Relay hub — parse inbound frames and fan them out.
//!
//! DESIGN
//! ======
//! The hub performs no interpretation of message semantics. A frame that
//! parses as JSON is re-serialized and broadcast to every other live
//! connection; one that does not parse earns the sender an error reply and
//! goes no further. The only fields the hub reads are `boardId` and
//! `userId`, noted on the registry entry so that partitioned deployments
//! can scope fan-out and so that a departure notice can be emitted when the
//! connection closes.
//!
//! FAILURE SEMANTICS
//! =================
//! A peer whose outbound queue is full or closed is skipped with a warning;
//! delivery to the remaining peers continues and the sender is never told.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::registry::{ConnectionHandle, Outbound};
use crate::state::AppState;

/// Process one inbound text frame from `conn_id` and fan it out. Returns
/// the frames owed to the sender — at most the malformed-payload reply.
pub(crate) async fn process_inbound_text(state: &AppState, conn_id: Uuid, text: &str) -> Vec<String> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: invalid inbound payload");
            let reply = serde_json::to_string(&wire::ErrorReply::invalid_json()).unwrap_or_default();
            return vec![reply];
        }
    };

    let board_id = value.get("boardId").and_then(Value::as_str);
    let user_id = value.get("userId").and_then(Value::as_str);
    state.registry.note_context(conn_id, board_id, user_id).await;

    let scope = if state.config.partition_by_board { board_id } else { None };
    let outbound = serde_json::to_string(&value).unwrap_or_default();
    broadcast_except(state, conn_id, scope, &outbound).await;

    Vec::new()
}

/// Fan a frame out to every other live connection, board-scoped when
/// partitioning is enabled.
pub(crate) async fn broadcast_except(state: &AppState, exclude: Uuid, board: Option<&str>, text: &str) {
    state
        .registry
        .for_each_except(exclude, board, |peer_id, handle| {
            // Best-effort: a slow or closed peer is skipped, never waited on.
            if let Err(e) = handle.tx.try_send(Outbound::Text(text.to_owned())) {
                warn!(%peer_id, error = %e, "ws: dropping frame for unreachable peer");
            }
        })
        .await;
}

/// Drop the registry entry for a closed connection and tell the remaining
/// peers, so subscribers clear the departed user's cursor.
pub(crate) async fn part_and_unregister(state: &AppState, conn_id: Uuid) {
    let Some(handle) = state.registry.unregister(conn_id).await else {
        // Already evicted by the heartbeat monitor, which sent the notice.
        return;
    };
    broadcast_part(state, conn_id, &handle).await;
}

/// Broadcast a departure notice for a connection that is gone from the
/// registry. Skipped when the connection never identified itself.
pub(crate) async fn broadcast_part(state: &AppState, conn_id: Uuid, handle: &ConnectionHandle) {
    let (Some(board_id), Some(user_id)) = (handle.board_id.as_ref(), handle.user_id.as_ref()) else {
        return;
    };

    let notice = wire::WireMessage::Part(wire::PartMessage {
        board_id: board_id.clone(),
        user_id: user_id.clone(),
    });
    let text = wire::encode_message(&notice);
    let scope = state.config.partition_by_board.then_some(board_id.as_str());
    broadcast_except(state, conn_id, scope, &text).await;
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
