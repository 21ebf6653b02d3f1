//! HTTP handlers for asset downloads.
//!
//! Two modes share the same path shape `{id}/{os}/{filename}`:
//! - the proxy route streams object bytes through this process with bounded
//!   buffering, and
//! - the redirect route answers 302 with a short-lived signed URL.

use crate::{
    errors::ApiError,
    services::{
        download::{DownloadStream, content_type_for},
        release_service::ReleaseService,
    },
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

/// Operating-system path segment. Anything outside this set is rejected by
/// path deserialization before reaching the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Windows,
    Mac,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Mac => "mac",
        }
    }
}

/// GET/HEAD `/releases/{id}/download/{os}/{filename}` — stream an asset
/// through this process.
///
/// HEAD short-circuits with a 200 and an empty body before any upstream
/// fetch, so no object stream is ever opened for it.
pub async fn proxy_download(
    State(service): State<ReleaseService>,
    Path((id, os, filename)): Path<(String, Os, String)>,
    method: Method,
) -> Result<Response, ApiError> {
    let key = service.asset_key(&id, os.as_str(), &filename);
    let content_type = content_type_for(&filename);
    let disposition = format!("attachment; filename=\"{}\"", filename);

    if method == Method::HEAD {
        let mut response = Response::new(Body::empty());
        set_download_headers(response.headers_mut(), content_type, &disposition, None);
        return Ok(response);
    }

    let download = service.fetch_asset(&key).await?;
    let source = download.body.ok_or_else(|| {
        warn!(key = %key, "object fetch returned no readable body");
        ApiError::Internal
    })?;

    let mut response = Response::new(Body::from_stream(DownloadStream::new(key, source)));
    set_download_headers(
        response.headers_mut(),
        content_type,
        &disposition,
        download.content_length,
    );
    Ok(response)
}

/// GET `/download/{id}/{os}/{filename}` — 302 redirect to a signed URL.
pub async fn redirect_download(
    State(service): State<ReleaseService>,
    Path((id, os, filename)): Path<(String, Os, String)>,
) -> Result<Response, ApiError> {
    let key = service.asset_key(&id, os.as_str(), &filename);
    let url = service.signed_download_url(&key).await?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    response.headers_mut().insert(
        header::LOCATION,
        HeaderValue::from_str(&url).map_err(|_| ApiError::Internal)?,
    );
    Ok(response)
}

fn set_download_headers(
    headers: &mut HeaderMap,
    content_type: &'static str,
    disposition: &str,
    content_length: Option<i64>,
) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    if let Ok(value) = HeaderValue::from_str(disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if let Some(length) = content_length {
        headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from_str(&length.max(0).to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("0")),
        );
    }
}
