//! herbtrace-ledger library - collection event traceability ledger
//!
//! Records herb harvest events, annotates them with a location check and a
//! simulated herb identification, and serves them over a JSON HTTP API.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use herbtrace_common::config::PaginationConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pagination;

use domain::CollectionEventStore;

/// Request bodies above this size are rejected
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CollectionEventStore>,
    /// Pool for health probes; `None` when running in memory
    pub db: Option<SqlitePool>,
    pub pagination: PaginationConfig,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<CollectionEventStore>,
        db: Option<SqlitePool>,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            store,
            db,
            pagination,
            startup_time: Instant::now(),
        }
    }
}

/// CORS policy from configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}

/// Hardening headers added to every response unless a handler set them
///
/// No Content-Security-Policy: the service only returns JSON.
pub fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
    ]
}

/// Build application router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    use axum::routing::get;

    let events = Router::new()
        .route(
            "/api/collection-events",
            get(api::list_events).post(api::submit_event),
        )
        .route("/api/collection-events/stats", get(api::get_stats))
        .route("/api/collection-events/:batch_id", get(api::get_event));

    let mut router = Router::new()
        .merge(events)
        .route("/api", get(api::api_info))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .fallback(api::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    for (name, value) in security_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
