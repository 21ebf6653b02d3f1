//! Object Store Gateway — list, fetch, and presign operations against the
//! remote object store.
//!
//! Transport failures are translated into the small `ApiError` taxonomy here
//! so nothing upstream of this module ever sees an SDK error type. The
//! single-object path intentionally collapses every fetch failure to
//! `NotFound`: distinguishing "missing" from "transient" is not exposed to
//! callers.

use crate::{errors::ApiError, models::object::ObjectEntry};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::DateTime as SmithyDateTime,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::{io, time::Duration};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

/// Byte stream carrying a proxied object body, bounded-memory by
/// construction: chunks are forwarded as they arrive, never accumulated.
pub type ObjectByteStream = BoxStream<'static, io::Result<Bytes>>;

/// One fetched object: metadata plus a readable body.
///
/// The body is `None` when the upstream response carried no readable stream;
/// the proxy path treats that as an internal error for GET requests.
pub struct ObjectDownload {
    pub content_length: Option<i64>,
    pub body: Option<ObjectByteStream>,
}

/// Operations the rest of the system needs from an object store.
///
/// Kept object-safe so services can run against in-memory fakes in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch all keys under `prefix`. Fails with `Internal` on transport
    /// errors, and also when the upstream reports zero contents — an empty
    /// prefix is an error condition here, not an empty-but-valid listing.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, ApiError>;

    /// Fetch one object for streaming out. Any failure maps to `NotFound`.
    async fn get_object(&self, key: &str) -> Result<ObjectDownload, ApiError>;

    /// Produce a time-limited authenticated URL for direct client download.
    /// No caching happens at this layer.
    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, ApiError>;
}

/// AWS S3 implementation of [`ObjectStore`].
#[derive(Clone)]
pub struct S3Gateway {
    client: Client,
    bucket: String,
}

impl S3Gateway {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Gateway {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, ApiError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| {
                warn!(prefix, error = %DisplayErrorContext(&err), "listing objects failed");
                ApiError::Internal
            })?;

            for obj in page.contents() {
                let Some(key) = obj.key() else {
                    debug!(prefix, "skipping listing entry without a key");
                    continue;
                };
                entries.push(ObjectEntry {
                    key: key.to_string(),
                    last_modified: to_chrono(obj.last_modified()),
                    size: obj.size().unwrap_or(0),
                });
            }
        }

        if entries.is_empty() {
            warn!(prefix, "no contents found under prefix");
            return Err(ApiError::Internal);
        }

        Ok(entries)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectDownload, ApiError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                debug!(key, error = %DisplayErrorContext(&err), "object fetch failed");
                ApiError::NotFound
            })?;

        let content_length = output.content_length();
        let body = ReaderStream::new(output.body.into_async_read()).boxed();

        Ok(ObjectDownload {
            content_length,
            body: Some(body),
        })
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, ApiError> {
        let presigning = PresigningConfig::expires_in(expires_in).map_err(|err| {
            warn!(key, error = %err, "invalid presigning expiry");
            ApiError::Internal
        })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| {
                warn!(key, error = %DisplayErrorContext(&err), "presigning failed");
                ApiError::Internal
            })?;

        Ok(request.uri().to_string())
    }
}

/// Convert an SDK timestamp into `chrono`. Missing or out-of-range values
/// fall back to the Unix epoch rather than failing the whole listing.
fn to_chrono(value: Option<&SmithyDateTime>) -> DateTime<Utc> {
    value
        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or_default()
}
