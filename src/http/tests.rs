//! Tests for the HTTP API server.

use super::*;
use axum::body::Body;
use axum::http::{Method, Request};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

/// Create a test router over a fresh registry.
fn create_test_app() -> (Router, Registry) {
    let registry = Registry::new();
    (router(registry.clone()), registry)
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
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// =========================================================================
// Status Tests
// =========================================================================

#[tokio::test]
async fn test_put_then_get() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, Method::PUT, "/v1/status/backup", Some(json!({"value": "OK"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(&app, Method::GET, "/v1/status/backup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "OK");
    assert!(body["lastUpdate"].is_string());
    assert!(body["expireDate"].is_null());
}

#[tokio::test]
async fn test_get_unknown_service() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, Method::GET, "/v1/status/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No such service"}));
}

#[tokio::test]
async fn test_put_value_too_long() {
    let (app, registry) = create_test_app();

    let value = "x".repeat(101);
    let (status, body) = send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": value}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Value string too long"}));
    assert!(registry.is_empty());

    let value = "x".repeat(100);
    let (status, _) = send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": value}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_put_value_not_string() {
    let (app, registry) = create_test_app();

    for body in [json!({"value": 42}), json!({}), json!({"value": null})] {
        let (status, body) = send(&app, Method::PUT, "/v1/status/a", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Value must be a string"}));
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_put_malformed_body() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/v1/status/a")
                .body(Body::from("value=OK"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_put_empty_value() {
    let (app, _) = create_test_app();

    let (status, _) = send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_service_name_is_not_found() {
    let (app, registry) = create_test_app();
    let long = format!("/v1/status/{}", "a".repeat(33));

    for uri in ["/v1/status/bad_name", "/v1/status/bad.name", long.as_str()] {
        let (status, _) = send(&app, Method::PUT, uri, Some(json!({"value": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_delete() {
    let (app, _) = create_test_app();
    send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": "x"}))).await;

    let (status, body) = send(&app, Method::DELETE, "/v1/status/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(&app, Method::DELETE, "/v1/status/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No such service"}));
}

#[tokio::test]
async fn test_services_list() {
    let (app, registry) = create_test_app();

    let (status, body) = send(&app, Method::GET, "/v1/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"services": [], "currentService": -1}));

    for name in ["a", "b", "c"] {
        send(&app, Method::PUT, &format!("/v1/status/{name}"), Some(json!({"value": "x"}))).await;
    }
    registry.advance();

    let (_, body) = send(&app, Method::GET, "/v1/services", None).await;
    assert_eq!(body, json!({"services": ["a", "b", "c"], "currentService": 1}));
}

#[tokio::test]
async fn test_update_keeps_order() {
    let (app, _) = create_test_app();
    for name in ["a", "b"] {
        send(&app, Method::PUT, &format!("/v1/status/{name}"), Some(json!({"value": "x"}))).await;
    }
    send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": "y"}))).await;

    let (_, body) = send(&app, Method::GET, "/v1/services", None).await;
    assert_eq!(body["services"], json!(["a", "b"]));
}

// =========================================================================
// Expiry Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_put_with_expire() {
    let (app, _) = create_test_app();

    let (status, _) = send(
        &app,
        Method::PUT,
        "/v1/status/x",
        Some(json!({"value": "v", "expire": 1000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/v1/status/x", None).await;
    assert!(body["expireDate"].is_string());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let (status, _) = send(&app, Method::GET, "/v1/status/x", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/v1/services", None).await;
    assert_eq!(body["currentService"], -1);
}

#[tokio::test(start_paused = true)]
async fn test_put_without_expire_clears_it() {
    let (app, _) = create_test_app();

    send(&app, Method::PUT, "/v1/status/x", Some(json!({"value": "v", "expire": "500"}))).await;
    send(&app, Method::PUT, "/v1/status/x", Some(json!({"value": "v"}))).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    let (status, body) = send(&app, Method::GET, "/v1/status/x", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["expireDate"].is_null());
}

#[tokio::test(start_paused = true)]
async fn test_negative_expire_removes_immediately() {
    let (app, registry) = create_test_app();

    send(&app, Method::PUT, "/v1/status/x", Some(json!({"value": "v", "expire": -10}))).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(registry.is_empty());
}

// =========================================================================
// System Tests
// =========================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, registry) = create_test_app();
    registry.upsert("a", "x").unwrap();

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
}

#[tokio::test]
async fn test_body_limit() {
    let (app, _) = create_test_app();

    let huge = "x".repeat(MAX_BODY_SIZE_BYTES + 1);
    let (status, _) = send(&app, Method::PUT, "/v1/status/a", Some(json!({"value": huge}))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = create_test_app();

    let (status, _) = send(&app, Method::GET, "/v1/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
