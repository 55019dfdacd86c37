//! Service description and unknown-route handling

use axum::{http::StatusCode, http::Uri, Json};
use serde::Serialize;
use serde_json::{json, Value};

/// Routes served by this module, as advertised to clients
pub const ENDPOINTS: &[&str] = &[
    "POST /api/collection-events",
    "GET /api/collection-events",
    "GET /api/collection-events/stats",
    "GET /api/collection-events/:batchId",
    "GET /api/buildinfo",
    "GET /health",
];

#[derive(Debug, Serialize)]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: &'static [&'static str],
}

/// GET /api
pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: "HerbTrace Ledger API",
        version: env!("CARGO_PKG_VERSION"),
        description: "Traceability ledger for medicinal herb harvest events",
        endpoints: ENDPOINTS,
    })
}

/// Fallback for any unmatched route
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "NOT_FOUND",
                "message": format!("Route {} not found", uri.path()),
                "details": { "availableEndpoints": ENDPOINTS },
            }
        })),
    )
}
