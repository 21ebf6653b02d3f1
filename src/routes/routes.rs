//! Defines routes for the release-distribution API.
//!
//! ## Structure
//! - **Release queries**
//!   - `GET  /releases` — list all releases
//!   - `GET  /releases/latest` — most recent release
//!   - `GET  /releases/{id}` — one release by id
//!   - `POST /releases/clear-cache` — invalidate cached listings (bearer auth)
//!
//! - **Downloads**
//!   - `GET/HEAD /releases/{id}/download/{os}/{filename}` — proxy an asset
//!   - `GET      /download/{id}/{os}/{filename}` — 302 redirect to a signed URL
//!
//! - **Probes**
//!   - `GET /health` — liveness
//!   - `GET /readyz` — cache readiness

use crate::{
    handlers::{
        download_handlers::{proxy_download, redirect_download},
        health_handlers::{health, readyz},
        release_handlers::{clear_cache, latest_release, list_releases, release_by_id},
    },
    services::release_service::ReleaseService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`ReleaseService`) to all handlers.
pub fn routes() -> Router<ReleaseService> {
    Router::new()
        // probes (mounted at root)
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        // release queries
        .route("/releases", get(list_releases))
        .route("/releases/latest", get(latest_release))
        .route("/releases/clear-cache", post(clear_cache))
        .route("/releases/{id}", get(release_by_id))
        // downloads (axum's `get` also serves HEAD; the proxy handler
        // short-circuits HEAD itself)
        .route(
            "/releases/{id}/download/{os}/{filename}",
            get(proxy_download),
        )
        .route("/download/{id}/{os}/{filename}", get(redirect_download))
}
