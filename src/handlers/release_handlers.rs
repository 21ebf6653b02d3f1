//! HTTP handlers for release queries and cache invalidation.
//! Delegates everything to `ReleaseService`; handlers only translate
//! between HTTP and the service surface.

use crate::{
    errors::ApiError,
    models::release::{Release, ReleaseList},
    services::release_service::ReleaseService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use serde_json::{Value, json};

/// GET `/releases` — all releases, oldest first.
pub async fn list_releases(
    State(service): State<ReleaseService>,
) -> Result<Json<ReleaseList>, ApiError> {
    service.list_releases().await.map(Json)
}

/// GET `/releases/latest` — the most recent release.
pub async fn latest_release(
    State(service): State<ReleaseService>,
) -> Result<Json<Release>, ApiError> {
    service.latest_release().await.map(Json)
}

/// GET `/releases/{id}` — one release by identifier.
pub async fn release_by_id(
    State(service): State<ReleaseService>,
    Path(id): Path<String>,
) -> Result<Json<Release>, ApiError> {
    service.release_by_id(&id).await.map(Json)
}

/// POST `/releases/clear-cache` — clear cached release listings.
///
/// Authorization happens inside the service, before any cache operation.
pub async fn clear_cache(
    State(service): State<ReleaseService>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let message = service.clear_cache(authorization).await?;
    Ok(Json(json!({ "message": message })))
}
