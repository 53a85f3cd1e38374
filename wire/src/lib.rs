//! Shared wire model for realtime board sync.
//!
//! This crate owns the message shapes used by both `relay` and `client`:
//! cursor presence messages, part notices, the relay's malformed-payload
//! reply, and the change-feed record shapes delivered by the storage
//! service. Everything travels as JSON text; payloads stay flexible
//! (`serde_json::Value`) where the schema is owned elsewhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error returned by [`decode_message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not valid JSON, or does not match a known message shape.
    #[error("failed to decode wire message: {0}")]
    Decode(#[from] serde_json::Error),
}

// =============================================================================
// PRESENCE MESSAGES
// =============================================================================

/// A message on the presence wire, discriminated by the `type` field.
///
/// Unknown `type` values fail to decode; receivers treat that as
/// "not for me" and drop the text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// A pointer position update from one user on one board.
    Cursor(CursorMessage),
    /// A user's connection left; receivers drop that user's cursor.
    Part(PartMessage),
}

/// Ephemeral cursor state. Never persisted; superseded by the next move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
    pub board_id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

/// Departure notice emitted by the relay when a connection closes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartMessage {
    pub board_id: String,
    pub user_id: String,
}

// =============================================================================
// ERROR REPLY
// =============================================================================

/// Message sent back to a sender whose payload could not be parsed.
pub const INVALID_JSON: &str = "Invalid JSON format";

/// The relay's only direct reply: sent to the originating connection when
/// its payload is not valid JSON. Never broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    #[must_use]
    pub fn invalid_json() -> Self {
        Self { error: INVALID_JSON.to_owned() }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a message as JSON text.
#[must_use]
pub fn encode_message(message: &WireMessage) -> String {
    // Serializing these shapes cannot fail: all keys are strings and all
    // values are JSON-representable.
    serde_json::to_string(message).unwrap_or_default()
}

/// Decode JSON text into a typed message.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or an unknown shape.
pub fn decode_message(text: &str) -> Result<WireMessage, CodecError> {
    Ok(serde_json::from_str(text)?)
}

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Kind of element mutation carried by a change-feed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

/// Record shape delivered by the storage service's change feed.
///
/// `new` carries the row after the mutation, `old` the row before it;
/// either may be absent depending on the event type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub event_type: ChangeType,
    #[serde(default)]
    pub new: Value,
    #[serde(default)]
    pub old: Value,
}

/// A board-scoped element mutation, ready for reconciliation.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub event_type: ChangeType,
    pub board_id: String,
    pub element_id: String,
    pub payload: Value,
}

impl ChangeEvent {
    /// Convert a raw feed record into a change event for one board.
    ///
    /// The element id comes from the mutated row (`new`, or `old` for
    /// deletes). Records without an id are malformed and yield `None`.
    #[must_use]
    pub fn from_feed(board_id: impl Into<String>, record: FeedRecord) -> Option<Self> {
        let payload = match record.event_type {
            ChangeType::Delete => record.old,
            ChangeType::Insert | ChangeType::Update => record.new,
        };
        let element_id = payload.get("id").and_then(Value::as_str)?.to_owned();

        Some(Self {
            event_type: record.event_type,
            board_id: board_id.into(),
            element_id,
            payload,
        })
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
