//! WebSocket handler — connection lifecycle and transport I/O.
//!
//! DESIGN
//! ======
//! On upgrade, the connection gets an opaque id and a bounded outbound
//! channel, registers itself, and enters a `select!` loop:
//! - Incoming text frames → hub parse + fan-out (`hub::process_inbound_text`)
//! - Queued outbound commands from peers/heartbeat → forward to the socket
//!
//! The hub logic is socket-free so tests can drive dispatch through plain
//! channels; this module owns only transport concerns.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register with liveness raised
//! 2. Frames relay both ways until the socket or the channel closes
//! 3. Close → departure notice to peers → registry cleanup

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::hub;
use crate::registry::Outbound;
use crate::state::AppState;

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();

    // Per-connection channel for frames from peers and heartbeat commands.
    let (tx, mut rx) = mpsc::channel::<Outbound>(256);
    state.registry.register(conn_id, tx).await;
    let connections = state.registry.len().await;
    info!(%conn_id, connections, "ws: connection registered");

    'conn: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in hub::process_inbound_text(&state, conn_id, text.as_str()).await {
                            if socket.send(Message::Text(reply.into())).await.is_err() {
                                break 'conn;
                            }
                        }
                    }
                    Message::Pong(_) => state.registry.mark_alive(conn_id).await,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(out) = rx.recv() => {
                match out {
                    Outbound::Text(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Ping => {
                        if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    hub::part_and_unregister(&state, conn_id).await;
    info!(%conn_id, "ws: connection closed");
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
