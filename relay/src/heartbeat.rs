//! Heartbeat monitor — detects and evicts unresponsive connections.
//!
//! DESIGN
//! ======
//! A background task runs one probe round per period. A round first evicts
//! every connection whose liveness flag is still lowered (it never
//! acknowledged the previous probe), then lowers all remaining flags and
//! sends a fresh ping. Pong handling in the websocket loop raises the flag,
//! so a silent peer survives at most two periods before eviction. The wide
//! window trades detection speed for few false positives.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::registry::Outbound;
use crate::state::{AppState, env_parse};

const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn the background heartbeat task. Returns a handle for shutdown.
pub fn spawn_heartbeat_task(state: AppState) -> JoinHandle<()> {
    let interval_secs = env_parse("HEARTBEAT_INTERVAL_SECS", DEFAULT_HEARTBEAT_INTERVAL_SECS);
    info!(interval_secs, "heartbeat monitor configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            probe_round(&state).await;
        }
    })
}

/// One probe round: evict connections that missed the previous probe, then
/// lower every remaining liveness flag and queue a fresh probe.
pub(crate) async fn probe_round(state: &AppState) {
    for (conn_id, handle) in state.registry.evict_unresponsive().await {
        warn!(%conn_id, "connection missed liveness probe; evicting");
        // Closing the transport ends the connection task; the registry entry
        // is already gone, so the task's own cleanup is a no-op.
        let _ = handle.tx.try_send(Outbound::Close);
        crate::hub::broadcast_part(state, conn_id, &handle).await;
    }

    for (conn_id, tx) in state.registry.clear_liveness().await {
        if tx.try_send(Outbound::Ping).is_err() {
            warn!(%conn_id, "failed to queue liveness probe");
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_test.rs"]
mod tests;
