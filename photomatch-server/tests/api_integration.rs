//! API integration tests for photomatch-server (review API).
//!
//! These tests drive the HTTP API against an in-memory store, covering the
//! fetch/commit/skip review flow through the REST endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use photomatch_core::{Fingerprint, InMemoryStore, Item, MatchState, MediaKind, ReferenceEntry};
use photomatch_server::{create_router, create_router_with_config, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Store with one image item, two reference candidates and one partner entry
fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    let mut item = Item::new(1, MediaKind::Image);
    item.filename = Some("IMG-20240301-WA0001.jpg".into());
    item.content_hash = Some(Fingerprint::from_u64(0));
    item.capture_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    store.insert_item(item);

    let mut with_camera = ReferenceEntry::new(100, MediaKind::Image);
    with_camera.content_hash = Some(Fingerprint::from_u64(0b1111));
    with_camera.camera_name = Some("Canon".into());
    with_camera.capture_time = Some(Utc.with_ymd_and_hms(2024, 2, 20, 10, 0, 0).unwrap());
    store.insert_reference(with_camera);

    let mut without_camera = ReferenceEntry::new(101, MediaKind::Image);
    without_camera.content_hash = Some(Fingerprint::from_u64(0b11));
    store.insert_reference(without_camera);

    let mut partner = ReferenceEntry::new(900, MediaKind::Image);
    partner.content_hash = Some(Fingerprint::from_u64(0b1));
    store.insert_partner(partner);

    store
}

/// Build the test router using the library's create_router function
fn create_test_app(store: Arc<InMemoryStore>) -> Router {
    create_router(AppState::new(store, &Config::default()))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = get_json(create_test_app(seeded_store()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "photomatch-server");
}

#[tokio::test]
async fn test_ready_reflects_store_health() {
    let store = seeded_store();
    let (status, json) = get_json(create_test_app(store.clone()), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);

    store.set_available(false);
    let (status, json) = get_json(create_test_app(store), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
}

#[tokio::test]
async fn test_version_endpoint() {
    let (status, json) = get_json(create_test_app(seeded_store()), "/api/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// ============================================================================
// Match Task Tests
// ============================================================================

#[tokio::test]
async fn test_next_match_task() {
    let (status, json) = get_json(create_test_app(seeded_store()), "/api/match").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["count"], 1);
    assert_eq!(json["offset"], 0);
    assert_eq!(json["item"]["id"], 1);
    assert_eq!(json["item"]["media_kind"], "image");
    assert_eq!(json["item"]["thumbnail_url"], "/api/item-thumbnail/1");

    let candidates = json["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    // dated candidate first, undated last
    assert_eq!(candidates[0]["id"], 100);
    assert_eq!(candidates[0]["hamming_distance"], 4);
    assert_eq!(candidates[0]["thumbnail_url"], "/api/thumbnail/100");
    assert_eq!(candidates[1]["id"], 101);

    assert_eq!(json["auto_select_id"], 100);

    let partner = json["partner_candidates"].as_array().unwrap();
    assert_eq!(partner.len(), 1);
    assert_eq!(partner[0]["id"], 900);
    assert!(partner[0]["thumbnail_url"].is_null());
}

#[tokio::test]
async fn test_offset_past_queue_end() {
    let (status, json) = get_json(create_test_app(seeded_store()), "/api/match/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["offset"], 3);
    assert!(json["item"].is_null());
    assert_eq!(json["candidates"], json!([]));
}

#[tokio::test]
async fn test_unsupported_media_kind_is_bad_request() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_item(Item::new(5, MediaKind::from_label("application/pdf")));

    let (status, json) = get_json(create_test_app(store), "/api/match").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNSUPPORTED_MEDIA_KIND");
}

#[tokio::test]
async fn test_partner_collection_missing_degrades() {
    let store = Arc::new(InMemoryStore::without_partner());
    let mut item = Item::new(1, MediaKind::Image);
    item.content_hash = Some(Fingerprint::from_u64(0));
    store.insert_item(item);

    let (status, json) = get_json(create_test_app(store), "/api/match").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["item"]["id"], 1);
    assert_eq!(json["partner_candidates"], json!([]));
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let store = seeded_store();
    store.set_available(false);

    let (status, json) = get_json(create_test_app(store), "/api/match").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
    assert_eq!(json["retryable"], true);
}

// ============================================================================
// Commit & Skip Tests
// ============================================================================

#[tokio::test]
async fn test_commit_match_and_repeat() {
    let store = seeded_store();
    let app = create_test_app(store.clone());

    let body = json!({ "item_id": 1, "reference_id": 100 });
    let (status, json) = post_json(app.clone(), "/api/match/commit", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["changed"], true);
    assert_eq!(json["match_state"], "matched");

    let (status, json) = post_json(app.clone(), "/api/match/commit", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], false);

    let stored = store.item(1).unwrap();
    assert_eq!(stored.match_state, MatchState::Matched);
    assert_eq!(stored.matched_reference_id, Some(100));

    let (_, json) = get_json(app, "/api/match").await;
    assert_eq!(json["count"], 0);
    assert!(json["item"].is_null());
}

#[tokio::test]
async fn test_commit_conflict() {
    let app = create_test_app(seeded_store());

    let (status, _) = post_json(
        app.clone(),
        "/api/match/commit",
        json!({ "item_id": 1, "reference_id": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_json(
        app,
        "/api/match/commit",
        json!({ "item_id": 1, "reference_id": 101 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICTING_TRANSITION");
    assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn test_commit_requires_item_id() {
    let app = create_test_app(seeded_store());

    let (status, json) = post_json(app.clone(), "/api/match/commit", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");

    let (status, _) = post_json(app, "/api/match/commit", json!({ "item_id": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_commit_unknown_item_is_not_found() {
    let (status, json) = post_json(
        create_test_app(seeded_store()),
        "/api/match/commit",
        json!({ "item_id": 404, "reference_id": null }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "ITEM_NOT_FOUND");
}

#[tokio::test]
async fn test_skip_item() {
    let store = seeded_store();
    let app = create_test_app(store.clone());

    let (status, json) = post_json(app.clone(), "/api/match/skip", json!({ "item_id": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_state"], "skipped");
    assert_eq!(store.item(1).unwrap().match_state, MatchState::Skipped);

    // skipped items cannot be matched afterwards
    let (status, _) = post_json(
        app,
        "/api/match/commit",
        json!({ "item_id": 1, "reference_id": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rematch_invalidates_cached_candidates() {
    let store = seeded_store();
    let mut item = store.item(1).unwrap();
    item.precomputed_candidate_ids = Some(vec![101]);
    store.insert_item(item);

    let app = create_test_app(store.clone());

    let (_, json) = get_json(app.clone(), "/api/match").await;
    assert_eq!(json["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(json["item"]["has_precomputed_candidates"], true);

    let (status, json) = post_json(
        app.clone(),
        "/api/match/commit",
        json!({ "item_id": 1, "rematch": true, "offset": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["changed"], true);
    assert_eq!(json["match_state"], "unresolved");

    let (_, json) = get_json(app, "/api/match").await;
    assert_eq!(json["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(json["item"]["has_precomputed_candidates"], false);
}

#[tokio::test]
async fn test_rematch_reset_policy() {
    let store = seeded_store();
    let config = Config {
        rematch_resets_state: true,
        ..Config::default()
    };
    let app = create_router_with_config(&config, AppState::new(store.clone(), &config));

    post_json(
        app.clone(),
        "/api/match/commit",
        json!({ "item_id": 1, "reference_id": 100 }),
    )
    .await;
    let (status, json) = post_json(
        app,
        "/api/match/commit",
        json!({ "item_id": 1, "rematch": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["match_state"], "unresolved");
    assert_eq!(store.item(1).unwrap().matched_reference_id, None);
}

// ============================================================================
// OpenAPI Tests
// ============================================================================

#[tokio::test]
async fn test_openapi_document() {
    let (status, json) = get_json(create_test_app(seeded_store()), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/match"].is_object());
    assert!(json["paths"]["/api/match/commit"].is_object());
    assert!(json["paths"]["/ready"].is_object());
}
