//! Board session lifecycle — wires the sync components together.
//!
//! LIFECYCLE
//! =========
//! 1. `Session::new` builds publisher, subscriber, and reconciler over
//!    shared state; nothing runs yet.
//! 2. `connect` spawns transport supervision (idempotent while running).
//! 3. `attach_feed` spawns the change-feed fold for this board.
//! 4. `close` aborts both tasks, releases the transport, and stops all
//!    further cursor/element mutation. In-flight relay fan-out on the hub
//!    is unaffected.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wire::{ChangeEvent, FeedRecord};

use crate::conn::{self, ConnShared, ConnectionStatus};
use crate::presence::{PresencePublisher, PresenceSubscriber, RemoteCursor};
use crate::reconciler::{ChangeStreamReconciler, ElementAttrs};
use crate::retry::{FixedDelay, RetryPolicy};

/// Default relay endpoint for local development.
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3000/ws";

/// Identity and board context for one board view. `user_id` is used only
/// for self-exclusion and map keying, never for authorization.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub board_id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
}

/// One client's binding to one board: presence both ways, element
/// reconciliation, and a supervised transport.
pub struct Session {
    url: String,
    ctx: SessionContext,
    shared: Arc<ConnShared>,
    publisher: PresencePublisher,
    subscriber: PresenceSubscriber,
    reconciler: Arc<ChangeStreamReconciler>,
    conn_task: Option<JoinHandle<()>>,
    feed_task: Option<JoinHandle<()>>,
}

impl Session {
    #[must_use]
    pub fn new(url: impl Into<String>, ctx: SessionContext) -> Self {
        let shared = Arc::new(ConnShared::default());
        let publisher = PresencePublisher::new(ctx.clone(), shared.clone());
        let subscriber = PresenceSubscriber::new(ctx.clone());
        let reconciler = Arc::new(ChangeStreamReconciler::new(ctx.board_id.clone()));
        Self {
            url: url.into(),
            ctx,
            shared,
            publisher,
            subscriber,
            reconciler,
            conn_task: None,
            feed_task: None,
        }
    }

    /// Establish the transport with the default keep-retrying policy.
    /// Calling this while supervision is already running is a no-op.
    pub fn connect(&mut self) {
        self.connect_with(Box::new(FixedDelay::default()));
    }

    /// Establish the transport with an injected retry policy.
    pub fn connect_with(&mut self, policy: Box<dyn RetryPolicy>) {
        if self.conn_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        self.conn_task = Some(tokio::spawn(conn::supervise(
            self.url.clone(),
            policy,
            self.shared.clone(),
            self.publisher.clone(),
            self.subscriber.clone(),
        )));
    }

    pub async fn status(&self) -> ConnectionStatus {
        *self.shared.status.read().await
    }

    /// Publish the local pointer position. Best-effort: dropped while the
    /// transport is down.
    pub async fn send_cursor(&self, x: f64, y: f64) {
        self.publisher.send_cursor(x, y).await;
    }

    /// Snapshot of remote cursors on this board.
    pub async fn cursors(&self) -> HashMap<String, RemoteCursor> {
        self.subscriber.snapshot().await
    }

    /// Snapshot of reconciled element state for this board.
    pub async fn elements(&self) -> HashMap<String, ElementAttrs> {
        self.reconciler.snapshot().await
    }

    /// Attach the storage service's change feed for this board. Records
    /// fold into element state in arrival order until the feed closes or
    /// the session does. Replaces any previously attached feed.
    pub fn attach_feed(&mut self, mut feed: mpsc::Receiver<FeedRecord>) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
        let reconciler = self.reconciler.clone();
        let board_id = self.ctx.board_id.clone();
        self.feed_task = Some(tokio::spawn(async move {
            while let Some(record) = feed.recv().await {
                // Records without an element id are malformed; skip them.
                let Some(event) = ChangeEvent::from_feed(board_id.clone(), record) else {
                    continue;
                };
                reconciler.on_event(event).await;
            }
        }));
    }

    /// Tear the session down: stop supervision and feed folding, release
    /// the transport, and stop all further cursor/element mutation.
    pub async fn close(&mut self) {
        if let Some(task) = self.conn_task.take() {
            task.abort();
        }
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
        self.shared.outbound.write().await.take();
        *self.shared.status.write().await = ConnectionStatus::Disconnected;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
