use super::*;
use serde_json::json;

fn event(event_type: ChangeType, board_id: &str, element_id: &str, payload: Value) -> ChangeEvent {
    ChangeEvent {
        event_type,
        board_id: board_id.to_owned(),
        element_id: element_id.to_owned(),
        payload,
    }
}

#[tokio::test]
async fn insert_creates_element_from_payload() {
    let reconciler = ChangeStreamReconciler::new("board-1");

    reconciler
        .on_event(event(
            ChangeType::Insert,
            "board-1",
            "el-1",
            json!({
                "x": 100.0,
                "y": 200.0,
                "width": 320.0,
                "height": 180.0,
                "content": "hello",
                "color": "#8BC34A",
                "strokeWidth": 3.0,
                "points": [{"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0}],
            }),
        ))
        .await;

    let elements = reconciler.snapshot().await;
    let el = elements.get("el-1").expect("element should exist");
    assert_eq!(el.x, 100.0);
    assert_eq!(el.y, 200.0);
    assert_eq!(el.width, 320.0);
    assert_eq!(el.height, 180.0);
    assert_eq!(el.content, "hello");
    assert_eq!(el.color, "#8BC34A");
    assert_eq!(el.stroke_width, 3.0);
    assert_eq!(el.points, vec![(1.0, 2.0), (3.0, 4.0)]);
}

#[tokio::test]
async fn insert_applies_fallbacks_for_missing_attributes() {
    let reconciler = ChangeStreamReconciler::new("board-1");

    reconciler
        .on_event(event(ChangeType::Insert, "board-1", "el-1", json!({"x": 5.0})))
        .await;

    let elements = reconciler.snapshot().await;
    let el = elements.get("el-1").expect("element should exist");
    assert_eq!(el.x, 5.0);
    assert_eq!(el.y, 0.0);
    assert_eq!(el.width, DEFAULT_WIDTH);
    assert_eq!(el.height, DEFAULT_HEIGHT);
    assert_eq!(el.content, "");
    assert_eq!(el.color, DEFAULT_COLOR);
    assert_eq!(el.stroke_width, DEFAULT_STROKE_WIDTH);
    assert!(el.points.is_empty());
}

#[tokio::test]
async fn update_replaces_the_whole_record() {
    let reconciler = ChangeStreamReconciler::new("board-1");
    reconciler
        .on_event(event(
            ChangeType::Insert,
            "board-1",
            "el-1",
            json!({"x": 1.0, "content": "old", "color": "#000000"}),
        ))
        .await;

    // The update payload carries only a position: not a field-level merge,
    // so content and color fall back to defaults.
    reconciler
        .on_event(event(ChangeType::Update, "board-1", "el-1", json!({"x": 9.0})))
        .await;

    let elements = reconciler.snapshot().await;
    let el = elements.get("el-1").expect("element should exist");
    assert_eq!(el.x, 9.0);
    assert_eq!(el.content, "");
    assert_eq!(el.color, DEFAULT_COLOR);
}

#[tokio::test]
async fn reapplying_the_same_update_changes_nothing() {
    let reconciler = ChangeStreamReconciler::new("board-1");
    let update = event(
        ChangeType::Update,
        "board-1",
        "el-1",
        json!({"x": 4.0, "y": 8.0, "content": "note"}),
    );

    reconciler.on_event(update.clone()).await;
    let once = reconciler.snapshot().await;

    reconciler.on_event(update).await;
    let twice = reconciler.snapshot().await;

    assert_eq!(once, twice);
}

#[tokio::test]
async fn delete_removes_and_absent_delete_is_noop() {
    let reconciler = ChangeStreamReconciler::new("board-1");
    reconciler
        .on_event(event(ChangeType::Insert, "board-1", "el-1", json!({"x": 1.0})))
        .await;

    reconciler
        .on_event(event(ChangeType::Delete, "board-1", "el-1", json!({"id": "el-1"})))
        .await;
    assert!(reconciler.snapshot().await.is_empty());

    // Deleting again, or deleting an id never seen, is not an error.
    reconciler
        .on_event(event(ChangeType::Delete, "board-1", "el-1", json!({"id": "el-1"})))
        .await;
    reconciler
        .on_event(event(ChangeType::Delete, "board-1", "ghost", json!({"id": "ghost"})))
        .await;
    assert!(reconciler.snapshot().await.is_empty());
}

#[tokio::test]
async fn foreign_board_event_is_dropped() {
    let reconciler = ChangeStreamReconciler::new("board-1");

    reconciler
        .on_event(event(ChangeType::Insert, "board-2", "el-1", json!({"x": 1.0})))
        .await;

    assert!(reconciler.snapshot().await.is_empty());
}

#[tokio::test]
async fn duplicate_insert_overwrites_in_place() {
    let reconciler = ChangeStreamReconciler::new("board-1");
    let insert = event(ChangeType::Insert, "board-1", "el-1", json!({"x": 3.0}));

    reconciler.on_event(insert.clone()).await;
    reconciler.on_event(insert).await;

    let elements = reconciler.snapshot().await;
    assert_eq!(elements.len(), 1);
    assert_eq!(elements.get("el-1").map(|el| el.x), Some(3.0));
}

#[tokio::test]
async fn malformed_points_entries_are_skipped() {
    let reconciler = ChangeStreamReconciler::new("board-1");

    reconciler
        .on_event(event(
            ChangeType::Insert,
            "board-1",
            "el-1",
            json!({"points": [{"x": 1.0, "y": 2.0}, {"x": 3.0}, "junk"]}),
        ))
        .await;

    let elements = reconciler.snapshot().await;
    assert_eq!(
        elements.get("el-1").map(|el| el.points.clone()),
        Some(vec![(1.0, 2.0)])
    );
}
