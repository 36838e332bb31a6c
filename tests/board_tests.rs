//! End-to-end board tests: HTTP updates flowing through the registry onto
//! an in-memory display, with tokio's clock paused.
//!
//! ```bash
//! cargo test --test board_tests
//! ```

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

use statusboard::board::{BoardTasks, StatusBoard};
use statusboard::config::BoardSettings;
use statusboard::device::{DisplayLog, DisplayOp, FixedReading, MemoryDisplay};
use statusboard::http;

// =============================================================================
// Helper Functions
// =============================================================================

struct Harness {
    board: StatusBoard,
    tasks: BoardTasks,
    app: Router,
    log: DisplayLog,
}

async fn start(display: MemoryDisplay, log: DisplayLog) -> Harness {
    let board = StatusBoard::new(Box::new(display), BoardSettings::default());
    let tasks = board
        .start(
            Box::new(FixedReading::new(51.0)),
            Box::new(FixedReading::new(0.5)),
        )
        .await
        .expect("board should start");
    let app = http::router(board.registry().clone());
    Harness {
        board,
        tasks,
        app,
        log,
    }
}

async fn start_default() -> Harness {
    let (display, log) = MemoryDisplay::new();
    start(display, log).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map_or_else(Body::empty, |json| Body::from(json.to_string()));
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn put(app: &Router, service: &str, body: Value) {
    let (status, _) = send(app, Method::PUT, &format!("/v1/status/{service}"), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
}

async fn stop(harness: Harness) {
    harness.tasks.shutdown().await;
    harness.board.close().await.unwrap();
    assert!(harness.log.is_closed());
}

// =============================================================================
// Rotation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_services_rotate_on_top_row() {
    let harness = start_default().await;
    put(&harness.app, "web", json!({"value": "web up"})).await;
    put(&harness.app, "db", json!({"value": "db up"})).await;

    // The cursor sits on the first service, so the first cycle moves past it.
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert_eq!(harness.log.screen()[0], "db up           ");

    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(harness.log.screen()[0], "web up          ");

    let (_, body) = send(&harness.app, Method::GET, "/v1/services", None).await;
    assert_eq!(body, json!({"services": ["web", "db"], "currentService": 0}));

    stop(harness).await;
}

#[tokio::test(start_paused = true)]
async fn test_stats_row_refreshes() {
    let harness = start_default().await;

    tokio::time::sleep(Duration::from_millis(5100)).await;
    assert_eq!(harness.log.screen()[1], "51\u{df}C         50%");
    let first = harness.log.row_writes(1).len();

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(harness.log.row_writes(1).len(), first + 1);

    stop(harness).await;
}

#[tokio::test(start_paused = true)]
async fn test_long_value_scrolls_to_the_end() {
    let harness = start_default().await;
    let value = "backup finished with 3 warnings";
    put(&harness.app, "backup", json!({"value": value})).await;

    // Lead-in plus one frame per offset.
    tokio::time::sleep(Duration::from_secs(3) + Duration::from_millis(500 * 20)).await;

    let writes = harness.log.row_writes(0);
    assert_eq!(writes.first().map(String::as_str), Some("backup finished "));
    assert_eq!(writes.last().map(String::as_str), Some(" with 3 warnings"));
    // Initial write plus 16 scroll frames.
    assert_eq!(writes.len(), 17);
    assert!(writes.iter().all(|w| w.chars().count() == 16));

    stop(harness).await;
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_service_leaves_rotation() {
    let harness = start_default().await;
    put(&harness.app, "job", json!({"value": "running", "expire": 2000})).await;

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let (status, _) = send(&harness.app, Method::GET, "/v1/status/job", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing left to show: the rotation blanks the row.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(harness.log.screen()[0], " ".repeat(16));

    stop(harness).await;
}

#[tokio::test(start_paused = true)]
async fn test_refresh_keeps_service_alive() {
    let harness = start_default().await;
    put(&harness.app, "job", json!({"value": "running", "expire": 2000})).await;

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        put(&harness.app, "job", json!({"value": "running", "expire": 2000})).await;
    }

    let (status, body) = send(&harness.app, Method::GET, "/v1/status/job", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expireDate"].is_string());

    stop(harness).await;
}

// =============================================================================
// Failure
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_display_failure_stops_board() {
    let (display, log) = MemoryDisplay::new();
    let mut harness = start(display.fail_after(1), log).await;
    put(&harness.app, "web", json!({"value": "up"})).await;

    let err = harness.tasks.next_exit().await.unwrap_err();
    assert!(err.is_fatal());

    // The API keeps answering while the process winds down.
    let (status, _) = send(&harness.app, Method::GET, "/v1/status/web", None).await;
    assert_eq!(status, StatusCode::OK);

    harness.tasks.shutdown().await;
    harness.board.close().await.unwrap();
    assert_eq!(harness.log.ops().last(), Some(&DisplayOp::Close));
}
