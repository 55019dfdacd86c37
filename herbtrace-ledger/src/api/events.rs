//! Collection event endpoints
//!
//! POST /api/collection-events, GET /api/collection-events,
//! GET /api/collection-events/stats, GET /api/collection-events/:batchId

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{CollectionEvent, EventFilter, LedgerStats, Submission};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageRequest, Pagination};
use crate::AppState;

/// Query parameters for listing events
///
/// Paging values are taken as strings so that junk like `page=abc` falls back
/// to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    #[serde(alias = "limit")]
    pub page_size: Option<String>,
    pub farmer_name: Option<String>,
    pub herb_name: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<CollectionEvent>,
    pub pagination: Pagination,
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// POST /api/collection-events
pub async fn submit_event(
    State(state): State<AppState>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CollectionEvent>)> {
    let Json(submission) = payload?;
    info!(
        farmer = submission.farmer_name.as_deref().unwrap_or_default(),
        herb = submission.herb_name.as_deref().unwrap_or_default(),
        "Received collection event submission"
    );

    let event = state.store.submit(&submission).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /api/collection-events
pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request = PageRequest::from_query(
        parse_number(query.page.as_deref()),
        parse_number(query.page_size.as_deref()),
        u64::from(state.pagination.default_page_size),
        u64::from(state.pagination.max_page_size),
    );
    let filter = EventFilter::new(query.farmer_name, query.herb_name, query.state);

    let page = state.store.list(&filter, request).await?;

    Ok(Json(ListResponse {
        items: page.items,
        pagination: calculate_pagination(page.total_count, request),
    }))
}

/// GET /api/collection-events/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<LedgerStats>> {
    Ok(Json(state.store.stats().await?))
}

/// GET /api/collection-events/:batchId
pub async fn get_event(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> ApiResult<Json<CollectionEvent>> {
    Ok(Json(state.store.get_by_batch_id(&batch_id).await?))
}
