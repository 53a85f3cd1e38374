//! Transport supervision — connect, run, reconnect.
//!
//! DESIGN
//! ======
//! One supervision loop per session. Each attempt creates a fresh outbound
//! channel and publishes its sender into shared state; while disconnected
//! the slot is empty, so cursor sends drop instead of queueing. When the
//! connection ends — cleanly or not — the loop sleeps out the retry
//! policy's delay and tries again, re-announcing the session's presence
//! once the transport is back.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};

use crate::presence::{PresencePublisher, PresenceSubscriber};
use crate::retry::RetryPolicy;

/// WebSocket connection status, readable at any time from the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// State shared between the supervision task and the session facade.
#[derive(Default)]
pub(crate) struct ConnShared {
    pub(crate) status: RwLock<ConnectionStatus>,
    /// Sender for the live connection's outbound queue; `None` while
    /// disconnected.
    pub(crate) outbound: RwLock<Option<mpsc::Sender<String>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("websocket transport failed: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),
}

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection supervision loop. Runs until the retry policy gives up (the
/// default policy never does) or the owning task is aborted.
pub(crate) async fn supervise(
    url: String,
    mut policy: Box<dyn RetryPolicy>,
    shared: Arc<ConnShared>,
    publisher: PresencePublisher,
    subscriber: PresenceSubscriber,
) {
    loop {
        *shared.status.write().await = ConnectionStatus::Connecting;

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                policy.reset();
                info!(%url, "ws connected");
                if let Err(e) = run_connection(stream, &shared, &publisher, &subscriber).await {
                    warn!(error = %e, "ws transport error");
                }
                shared.outbound.write().await.take();
            }
            Err(e) => {
                warn!(error = %e, "ws connect failed");
            }
        }

        *shared.status.write().await = ConnectionStatus::Disconnected;

        let Some(delay) = policy.next_delay() else {
            warn!("retry policy exhausted; staying disconnected");
            return;
        };
        tokio::time::sleep(delay).await;
    }
}

/// Drive one established connection until it closes.
async fn run_connection(
    stream: Transport,
    shared: &ConnShared,
    publisher: &PresencePublisher,
    subscriber: &PresenceSubscriber,
) -> Result<(), ClientError> {
    let (mut ws_write, mut ws_read) = stream.split();

    let (tx, mut rx) = mpsc::channel::<String>(64);
    *shared.outbound.write().await = Some(tx);
    *shared.status.write().await = ConnectionStatus::Connected;

    // Re-bind board context so presence resumes seamlessly after a reconnect.
    publisher.announce().await;

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(text) = outgoing else { break };
                if ws_write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = ws_read.next() => {
                let Some(msg) = incoming else { break };
                match msg.map_err(|e| ClientError::Transport(Box::new(e)))? {
                    Message::Text(text) => subscriber.on_message(text.as_str()).await,
                    Message::Ping(payload) => {
                        // Answer the hub's liveness probes.
                        let _ = ws_write.send(Message::Pong(payload)).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "conn_test.rs"]
mod tests;
