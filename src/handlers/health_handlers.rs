//! Health & readiness handlers.
//!
//! - GET /health -> simple liveness probe
//! - GET /readyz -> readiness that checks cache connectivity

use crate::services::release_service::ReleaseService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /health`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            message: "Success".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that pings the cache connection pool. HTTP 200 when the
/// cache answers, HTTP 503 when it does not.
pub async fn readyz(State(service): State<ReleaseService>) -> impl IntoResponse {
    match service.cache_ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ok".into(),
                error: None,
            }),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "error".into(),
                error: Some(err.to_string()),
            }),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    message: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
