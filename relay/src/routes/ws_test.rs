use super::*;
use crate::state::test_helpers;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Serve the relay on an ephemeral port and return its websocket URL.
async fn spawn_relay() -> (String, AppState) {
    let state = test_helpers::test_app_state();
    let app = crate::routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve failed");
    });
    (format!("ws://{addr}/ws"), state)
}

async fn connect(url: &str) -> WsStream {
    let (stream, _) = connect_async(url).await.expect("connect should succeed");
    stream
}

/// Registration happens after the upgrade completes; wait for it so the
/// first broadcast cannot race the handshake.
async fn wait_for_connections(state: &AppState, count: usize) {
    for _ in 0..100 {
        if state.registry.len().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} registered connections");
}

async fn recv_text(stream: &mut WsStream) -> String {
    let fut = async {
        loop {
            let msg = stream
                .next()
                .await
                .expect("stream ended unexpectedly")
                .expect("websocket error");
            if let WsMessage::Text(text) = msg {
                return text.as_str().to_owned();
            }
        }
    };
    timeout(Duration::from_secs(2), fut)
        .await
        .expect("timed out waiting for text frame")
}

async fn assert_silent(stream: &mut WsStream) {
    assert!(
        timeout(Duration::from_millis(150), stream.next()).await.is_err(),
        "expected no frame"
    );
}

fn cursor_json(user_id: &str, x: f64, y: f64) -> String {
    json!({
        "type": "cursor",
        "boardId": "board-42",
        "userId": user_id,
        "name": "Alice",
        "color": "#ff0000",
        "x": x,
        "y": y,
    })
    .to_string()
}

#[tokio::test]
async fn cursor_frame_reaches_other_client_but_never_echoes_to_sender() {
    let (url, state) = spawn_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    wait_for_connections(&state, 2).await;

    a.send(WsMessage::Text(cursor_json("user-a", 10.0, 20.0).into()))
        .await
        .expect("send should succeed");

    let value: serde_json::Value = serde_json::from_str(&recv_text(&mut b).await).expect("json");
    assert_eq!(value.get("userId").and_then(serde_json::Value::as_str), Some("user-a"));
    assert_eq!(value.get("x").and_then(serde_json::Value::as_f64), Some(10.0));
    assert_eq!(value.get("y").and_then(serde_json::Value::as_f64), Some(20.0));

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn invalid_json_earns_sender_an_error_reply_without_disrupting_peers() {
    let (url, state) = spawn_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    let mut c = connect(&url).await;
    wait_for_connections(&state, 3).await;

    a.send(WsMessage::Text("this is not json".into()))
        .await
        .expect("send should succeed");

    let reply: serde_json::Value = serde_json::from_str(&recv_text(&mut a).await).expect("json");
    assert_eq!(
        reply.get("error").and_then(serde_json::Value::as_str),
        Some("Invalid JSON format")
    );

    // A later valid frame from a different connection still relays.
    b.send(WsMessage::Text(cursor_json("user-b", 1.0, 2.0).into()))
        .await
        .expect("send should succeed");
    let value: serde_json::Value = serde_json::from_str(&recv_text(&mut c).await).expect("json");
    assert_eq!(value.get("userId").and_then(serde_json::Value::as_str), Some("user-b"));
}

#[tokio::test]
async fn disconnect_broadcasts_part_notice_to_remaining_clients() {
    let (url, state) = spawn_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    wait_for_connections(&state, 2).await;

    a.send(WsMessage::Text(cursor_json("user-a", 3.0, 4.0).into()))
        .await
        .expect("send should succeed");
    let _cursor = recv_text(&mut b).await;

    a.close(None).await.expect("close should succeed");

    let value: serde_json::Value = serde_json::from_str(&recv_text(&mut b).await).expect("json");
    assert_eq!(value.get("type").and_then(serde_json::Value::as_str), Some("part"));
    assert_eq!(value.get("boardId").and_then(serde_json::Value::as_str), Some("board-42"));
    assert_eq!(value.get("userId").and_then(serde_json::Value::as_str), Some("user-a"));
}
