//! Change stream reconciler — folds element mutations into local state.
//!
//! DESIGN
//! ======
//! The storage service's change feed is ground truth: events apply in
//! arrival order with no causal metadata and are never rejected as "out of
//! order". Insert and update both install a freshly transformed value
//! wholesale (last write wins, whole record), which makes reapplying the
//! same event a no-op. Cross-element ordering is not guaranteed upstream
//! and not reconstructed here.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use wire::{ChangeEvent, ChangeType};

pub const DEFAULT_WIDTH: f64 = 160.0;
pub const DEFAULT_HEIGHT: f64 = 100.0;
pub const DEFAULT_COLOR: &str = "#FFEB3B";
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Rendered attributes of one canvas element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementAttrs {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub content: String,
    pub color: String,
    pub stroke_width: f64,
    pub points: Vec<(f64, f64)>,
}

impl ElementAttrs {
    /// Pure transform from a feed payload. Missing optional attributes take
    /// fixed fallbacks, so the result depends only on the payload.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            x: payload.get("x").and_then(Value::as_f64).unwrap_or(0.0),
            y: payload.get("y").and_then(Value::as_f64).unwrap_or(0.0),
            width: payload.get("width").and_then(Value::as_f64).unwrap_or(DEFAULT_WIDTH),
            height: payload
                .get("height")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_HEIGHT),
            content: payload
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            color: payload
                .get("color")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_COLOR)
                .to_owned(),
            stroke_width: payload
                .get("strokeWidth")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_STROKE_WIDTH),
            points: parse_points(payload.get("points")),
        }
    }
}

fn parse_points(value: Option<&Value>) -> Vec<(f64, f64)> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|point| {
            let x = point.get("x").and_then(Value::as_f64)?;
            let y = point.get("y").and_then(Value::as_f64)?;
            Some((x, y))
        })
        .collect()
}

/// Folds a board's change events into element state, in arrival order.
pub struct ChangeStreamReconciler {
    board_id: String,
    elements: Arc<RwLock<HashMap<String, ElementAttrs>>>,
}

impl ChangeStreamReconciler {
    #[must_use]
    pub fn new(board_id: impl Into<String>) -> Self {
        Self { board_id: board_id.into(), elements: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Apply one change event. Events for other boards are dropped; deleting
    /// an absent element is a no-op.
    pub async fn on_event(&self, event: ChangeEvent) {
        if event.board_id != self.board_id {
            return;
        }

        match event.event_type {
            ChangeType::Insert | ChangeType::Update => {
                self.elements
                    .write()
                    .await
                    .insert(event.element_id, ElementAttrs::from_payload(&event.payload));
            }
            ChangeType::Delete => {
                self.elements.write().await.remove(&event.element_id);
            }
        }
    }

    /// Read-only snapshot for the rendering layer.
    pub async fn snapshot(&self) -> HashMap<String, ElementAttrs> {
        self.elements.read().await.clone()
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
