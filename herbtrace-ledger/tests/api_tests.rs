//! Integration tests for the herbtrace-ledger HTTP API
//!
//! Each test runs the full router against a fresh SQLite database in a
//! temporary directory with an instant, deterministic verifier.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use herbtrace_common::config::{DatabaseConfig, PaginationConfig};
use herbtrace_common::db::init_database;
use herbtrace_ledger::db::{InMemoryEventRepository, SqliteEventRepository};
use herbtrace_ledger::domain::{CollectionEventStore, SimulatedVerifier};
use herbtrace_ledger::{build_router, AppState};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Router over a temporary SQLite database
///
/// TempDir must be kept alive for the duration of the test
async fn setup_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("herbtrace.db"), &DatabaseConfig::default())
        .await
        .expect("Should initialize test database");

    let store = CollectionEventStore::new(
        Arc::new(SqliteEventRepository::new(pool.clone(), 1000)),
        Arc::new(SimulatedVerifier::new(Duration::ZERO, 0.0)),
    );
    let state = AppState::new(Arc::new(store), Some(pool), PaginationConfig::default());
    (dir, build_router(state, &["http://localhost:3000".to_string()]))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn harvest(farmer: &str, herb: &str, lat: f64, lon: f64) -> Value {
    json!({
        "farmerName": farmer,
        "herbName": herb,
        "quantity": 2.5,
        "latitude": lat,
        "longitude": lon,
        "imageUrl": "http://x/img.png"
    })
}

async fn submit(app: &Router, body: Value) -> Value {
    let (status, event) = send(app, json_request("POST", "/api/collection-events", &body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected response: {}", event);
    event
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_creates_annotated_event() {
    let (_dir, app) = setup_app().await;

    let event = submit(&app, harvest("Ramesh", "Tulsi", 19.0, 75.0)).await;

    let batch_id = event["batchId"].as_str().unwrap();
    assert!(Regex::new(r"^BATCH-\d+$").unwrap().is_match(batch_id));
    assert_eq!(event["farmerName"], "Ramesh");
    assert_eq!(event["herbName"], "Tulsi");
    assert_eq!(event["quantity"], 2.5);
    assert_eq!(event["location"]["latitude"], 19.0);
    assert_eq!(event["location"]["longitude"], 75.0);
    assert_eq!(event["geoVerification"]["isWithinIndia"], true);
    assert_eq!(event["geoVerification"]["country"], "India");
    assert_eq!(event["geoVerification"]["state"], "Maharashtra");

    let confidence = event["aiVerification"]["confidence"].as_u64().unwrap();
    assert!((90..=98).contains(&confidence));
    assert_eq!(event["aiVerification"]["verifiedHerb"], "Tulsi");

    let timestamp = event["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_submit_outside_india() {
    let (_dir, app) = setup_app().await;

    let event = submit(&app, harvest("John", "Sage", 51.5, -0.12)).await;

    assert_eq!(event["geoVerification"]["isWithinIndia"], false);
    assert_eq!(event["geoVerification"]["country"], "Outside India");
    assert_eq!(event["geoVerification"]["state"], "Unknown");
}

#[tokio::test]
async fn test_submit_missing_fields_lists_all_of_them() {
    let (_dir, app) = setup_app().await;

    let body = json!({ "herbName": "Tulsi", "quantity": 1, "latitude": 19.0, "longitude": 75.0 });
    let (status, body) = send(&app, json_request("POST", "/api/collection-events", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["fields"], json!(["farmerName", "imageUrl"]));
}

#[tokio::test]
async fn test_submit_rejects_bad_ranges() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/collection-events", &harvest("A", "B", 95.0, 75.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["fields"], json!(["latitude"]));

    let mut zero = harvest("A", "B", 19.0, 75.0);
    zero["quantity"] = json!(0);
    let (status, body) = send(&app, json_request("POST", "/api/collection-events", &zero)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["fields"], json!(["quantity"]));

    let long_name = "x".repeat(101);
    let (status, body) = send(
        &app,
        json_request("POST", "/api/collection-events", &harvest(&long_name, "B", 19.0, 75.0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["fields"], json!(["farmerName"]));

    // Nothing above was stored
    let (_, list) = send(&app, test_request("GET", "/api/collection-events")).await;
    assert_eq!(list["pagination"]["totalEvents"], 0);
}

#[tokio::test]
async fn test_submit_zero_coordinate_is_missing() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/collection-events", &harvest("A", "B", 0.0, 75.0)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["fields"], json!(["latitude"]));
}

#[tokio::test]
async fn test_submit_malformed_json() {
    let (_dir, app) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/collection-events")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Lookup
// =============================================================================

#[tokio::test]
async fn test_get_returns_identical_record() {
    let (_dir, app) = setup_app().await;
    let created = submit(&app, harvest("Ramesh", "Tulsi", 19.0, 75.0)).await;

    let uri = format!("/api/collection-events/{}", created["batchId"].as_str().unwrap());
    let (status, fetched) = send(&app, test_request("GET", &uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_unknown_batch_id() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/collection-events/BATCH-42")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_filters_by_farmer_substring() {
    let (_dir, app) = setup_app().await;
    submit(&app, harvest("Ramesh", "Tulsi", 19.0, 75.0)).await;
    submit(&app, harvest("Suresh", "Neem", 23.0, 72.0)).await;
    submit(&app, harvest("Vikram", "Ashwagandha", 28.6, 77.2)).await;

    let (status, body) = send(&app, test_request("GET", "/api/collection-events?farmerName=RAM")).await;

    assert_eq!(status, StatusCode::OK);
    let farmers: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["farmerName"].as_str().unwrap())
        .collect();
    assert_eq!(farmers, vec!["Vikram", "Ramesh"]);
    assert_eq!(body["pagination"]["totalEvents"], 2);
}

#[tokio::test]
async fn test_list_filters_by_herb_and_state() {
    let (_dir, app) = setup_app().await;
    submit(&app, harvest("A", "Tulsi", 19.0, 75.0)).await;
    submit(&app, harvest("B", "Tulsi", 23.0, 72.0)).await;
    submit(&app, harvest("C", "Neem", 19.5, 76.0)).await;

    let (_, body) = send(
        &app,
        test_request("GET", "/api/collection-events?herbName=tulsi&state=maharashtra"),
    )
    .await;

    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["farmerName"], "A");
}

#[tokio::test]
async fn test_list_pagination() {
    let (_dir, app) = setup_app().await;
    for i in 0..5 {
        submit(&app, harvest(&format!("Farmer {}", i), "Tulsi", 19.0, 75.0)).await;
    }

    let (_, body) = send(&app, test_request("GET", "/api/collection-events?page=2&pageSize=2")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["farmerName"], "Farmer 2");
    assert_eq!(
        body["pagination"],
        json!({
            "currentPage": 2,
            "totalPages": 3,
            "totalEvents": 5,
            "pageSize": 2,
            "hasNext": true,
            "hasPrev": true
        })
    );

    // `limit` is accepted as an alias for pageSize
    let (_, body) = send(&app, test_request("GET", "/api/collection-events?limit=4")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 4);
    assert_eq!(body["pagination"]["pageSize"], 4);

    // Past the last page: empty, not an error
    let (status, body) = send(&app, test_request("GET", "/api/collection-events?page=9&pageSize=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["hasNext"], false);
}

#[tokio::test]
async fn test_list_defaults_on_junk_paging() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/collection-events?page=abc&pageSize=-5")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["currentPage"], 1);
    assert_eq!(body["pagination"]["pageSize"], 10);
}

// =============================================================================
// Statistics
// =============================================================================

#[tokio::test]
async fn test_stats_empty_ledger() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/collection-events/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "overview": {
                "totalEvents": 0,
                "eventsWithinIndia": 0,
                "eventsOutsideIndia": 0,
                "verificationRate": 0.0
            },
            "herbDistribution": [],
            "stateDistribution": []
        })
    );
}

#[tokio::test]
async fn test_stats_aggregates_events() {
    let (_dir, app) = setup_app().await;
    submit(&app, harvest("A", "Tulsi", 19.0, 75.0)).await;
    submit(&app, harvest("B", "Tulsi", 19.5, 76.0)).await;
    submit(&app, harvest("C", "Neem", 23.0, 72.0)).await;
    submit(&app, harvest("D", "Sage", 51.5, -0.12)).await;

    let (_, body) = send(&app, test_request("GET", "/api/collection-events/stats")).await;

    assert_eq!(body["overview"]["totalEvents"], 4);
    assert_eq!(body["overview"]["eventsWithinIndia"], 3);
    assert_eq!(body["overview"]["eventsOutsideIndia"], 1);
    assert_eq!(body["overview"]["verificationRate"], 75.0);

    assert_eq!(body["herbDistribution"][0]["herbName"], "Tulsi");
    assert_eq!(body["herbDistribution"][0]["count"], 2);
    assert_eq!(body["herbDistribution"][0]["totalQuantity"], 5.0);
    assert_eq!(body["herbDistribution"].as_array().unwrap().len(), 3);

    let states: Vec<_> = body["stateDistribution"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["state"].as_str().unwrap())
        .collect();
    assert_eq!(states, vec!["Maharashtra", "Gujarat"]);
}

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn test_health_reports_database() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "herbtrace-ledger");
    assert_eq!(body["database"], "connected");
    assert!(body["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_health_in_memory() {
    let store = CollectionEventStore::new(
        Arc::new(InMemoryEventRepository::new()),
        Arc::new(SimulatedVerifier::new(Duration::ZERO, 0.0)),
    );
    let app = build_router(
        AppState::new(Arc::new(store), None, PaginationConfig::default()),
        &[],
    );

    let (_, body) = send(&app, test_request("GET", "/health")).await;
    assert_eq!(body["database"], "in-memory");
}

#[tokio::test]
async fn test_api_info_and_buildinfo() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .contains(&json!("POST /api/collection-events")));

    let (status, body) = send(&app, test_request("GET", "/api/buildinfo")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, test_request("GET", "/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Route /api/nope not found");
    assert!(body["error"]["details"]["availableEndpoints"].is_array());
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let (_dir, app) = setup_app().await;

    for uri in ["/health", "/api/collection-events", "/api/nope"] {
        let response = app.clone().oneshot(test_request("GET", uri)).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers["x-content-type-options"], "nosniff", "{uri}");
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN", "{uri}");
        assert_eq!(headers["referrer-policy"], "no-referrer", "{uri}");
        assert_eq!(headers["cross-origin-resource-policy"], "same-origin", "{uri}");
        assert!(headers.contains_key("strict-transport-security"), "{uri}");
        assert!(!headers.contains_key("content-security-policy"), "{uri}");
    }
}
