//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use listings_cache::{api::create_router, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(&Config::default()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn listings_body(ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": id.to_uppercase(), "author": "alice"}))
        .collect();
    json!({"data": {"newest": items, "popular": []}})
}

fn newest_ids(entry: &Value) -> Vec<String> {
    entry["data"]["newest"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

const LISTINGS_URI: &str = "/cache/listings:items:v2:0:16";

// == PUT /cache/:key ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(LISTINGS_URI)
                .header("content-type", "application/json")
                .body(Body::from(listings_body(&["a"]).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("listings:items"));
    assert_eq!(json["updated"], true);
}

// == GET /cache/:key ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a", "b"]))).await;

    let (status, json) = send(&app, "GET", LISTINGS_URI, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "listings:items:v2:0:16");
    assert_eq!(json["namespace"], "listings");
    assert_eq!(newest_ids(&json), vec!["a", "b"]);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_get_endpoint_keeps_unknown_payload_fields() {
    let app = create_test_app();
    let data = json!({
        "newest": [{"id": "a", "category": "tools"}],
        "popular": [],
        "generatedAt": "2024-01-01T00:00:00Z"
    });
    send(&app, "PUT", LISTINGS_URI, Some(json!({ "data": data.clone() }))).await;

    let (status, json) = send(&app, "GET", LISTINGS_URI, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], data);
}

#[tokio::test]
async fn test_single_list_payload_is_patched() {
    let app = create_test_app();
    send(
        &app,
        "PUT",
        LISTINGS_URI,
        Some(json!({"data": {"newest": [{"id": "a"}, {"id": "b"}]}})),
    )
    .await;
    send(
        &app,
        "POST",
        "/events",
        Some(json!({"type": "item_deleted", "itemId": "a"})),
    )
    .await;

    let (_, entry) = send(&app, "GET", LISTINGS_URI, None).await;

    assert_eq!(entry["data"], json!({"newest": [{"id": "b"}]}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/cache/nonexistent", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

// == POST /events ==

#[tokio::test]
async fn test_created_event_prepends_item() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a", "b"]))).await;

    let (status, json) = send(
        &app,
        "POST",
        "/events",
        Some(json!({
            "type": "item_created",
            "itemId": "x",
            "username": "bob",
            "data": {"title": "X"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["seq"], 1);

    let (_, entry) = send(&app, "GET", LISTINGS_URI, None).await;
    assert_eq!(newest_ids(&entry), vec!["x", "a", "b"]);
    assert_eq!(entry["data"]["newest"][0]["author"], "bob");
    assert_eq!(entry["data"]["newest"][0]["views"], 0);
}

#[tokio::test]
async fn test_deleted_event_is_idempotent() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a", "b"]))).await;
    send(
        &app,
        "POST",
        "/events",
        Some(json!({"type": "item_deleted", "itemId": "a"})),
    )
    .await;

    let (_, first) = send(&app, "GET", LISTINGS_URI, None).await;
    let (_, second) = send(&app, "GET", LISTINGS_URI, None).await;

    assert_eq!(newest_ids(&first), vec!["b"]);
    assert_eq!(first["data"], second["data"]);
    assert_eq!(first["version"], second["version"]);
}

#[tokio::test]
async fn test_verification_event_updates_author() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a"]))).await;
    send(
        &app,
        "POST",
        "/events",
        Some(json!({
            "type": "verification_changed",
            "username": "alice",
            "data": {"isVerified": true}
        })),
    )
    .await;

    let (_, entry) = send(&app, "GET", LISTINGS_URI, None).await;
    assert_eq!(entry["data"]["newest"][0]["authorVerified"], true);
}

#[tokio::test]
async fn test_event_missing_identity_rejected() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "POST",
        "/events",
        Some(json!({"type": "item_updated", "data": {"title": "T"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["change_events"], 0);
}

#[tokio::test]
async fn test_event_unknown_type_rejected() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/events",
        Some(json!({"type": "item_exploded", "itemId": "a"})),
    )
    .await;

    assert!(status.is_client_error());
}

// == PATCH /cache/:key ==

#[tokio::test]
async fn test_patch_endpoint() {
    let app = create_test_app();
    send(
        &app,
        "PUT",
        "/cache/search:q:1",
        Some(json!({"data": {"scripts": [], "total": 0, "page": 1, "limit": 20}})),
    )
    .await;

    let (status, json) = send(&app, "PATCH", "/cache/search:q:1", Some(json!({"page": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], true);

    let (_, entry) = send(&app, "GET", "/cache/search:q:1", None).await;
    assert_eq!(entry["data"]["page"], 2);
}

#[tokio::test]
async fn test_patch_missing_key() {
    let app = create_test_app();

    let (status, _) = send(&app, "PATCH", "/cache/missing", Some(json!({"page": 2}))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == DELETE /cache, DELETE /cache/pattern/:pattern ==

#[tokio::test]
async fn test_clear_by_pattern_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a"]))).await;
    send(&app, "PUT", "/cache/search:a", Some(listings_body(&["a"]))).await;
    send(&app, "PUT", "/cache/search:b", Some(listings_body(&["b"]))).await;

    let (status, json) = send(&app, "DELETE", "/cache/pattern/search", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);

    let (_, keys) = send(&app, "GET", "/cache", None).await;
    assert_eq!(keys["keys"], json!(["listings:items:v2:0:16"]));
}

#[tokio::test]
async fn test_clear_all_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a"]))).await;
    send(
        &app,
        "POST",
        "/events",
        Some(json!({"type": "item_deleted", "itemId": "a"})),
    )
    .await;

    let (status, json) = send(&app, "DELETE", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["total_entries"], 0);
    assert_eq!(stats["change_events"], 0);
}

// == Stats and Health ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", LISTINGS_URI, Some(listings_body(&["a"]))).await;

    send(&app, "GET", LISTINGS_URI, None).await;
    send(&app, "GET", LISTINGS_URI, None).await;
    send(&app, "GET", "/cache/nonexistent", None).await;

    let (status, json) = send(&app, "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["max_entries"], 100);

    let hit_rate = json["hit_rate"].as_f64().unwrap();
    assert!((hit_rate - 2.0 / 3.0).abs() < 0.01);
}

#[tokio::test]
async fn test_stats_count_evictions() {
    let app = create_router(AppState::from_config(&Config {
        max_entries: 2,
        ..Config::default()
    }));

    for key in ["a", "b", "c"] {
        send(&app, "PUT", &format!("/cache/{}", key), Some(json!({"data": key}))).await;
    }

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["evictions"], 1);

    let (_, keys) = send(&app, "GET", "/cache", None).await;
    assert_eq!(keys["keys"], json!(["b", "c"]));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Handling ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
