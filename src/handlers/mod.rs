//! HTTP handlers for the release, download, and health endpoints.

pub mod download_handlers;
pub mod health_handlers;
pub mod release_handlers;
