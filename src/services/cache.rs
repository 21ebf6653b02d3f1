//! Cache Layer — a TTL key/value side-cache in front of the object store.
//!
//! Two logical namespaces: `listing-cache:<prefix>:<depth>` for filtered
//! object listings (TTL 3600 s) and `signed-url-cache:<resourcePath>` for
//! generated signed URLs (TTL 60 s). Entries are written only after the
//! upstream value is fully materialized, and never on an upstream error.
//!
//! The cache is strictly an accelerator: a failed cache read degrades to a
//! miss and a failed cache write is logged and swallowed, so a cache outage
//! slows the API down but does not take it down.
//!
//! No lock is held across the miss-fetch-populate sequence. Two concurrent
//! misses for the same key may both fetch upstream and both write the cache;
//! last write wins over idempotent derivations of the same upstream truth.

use crate::{
    errors::ApiError,
    models::object::ObjectEntry,
    services::object_store::ObjectStore,
};
use async_trait::async_trait;
use bb8_redis::{
    RedisConnectionManager,
    bb8,
    redis::{self, AsyncCommands},
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

/// TTL for cached object listings.
pub const LISTING_TTL_SECONDS: u64 = 3600;

/// TTL for cached signed URLs. A cached URL's validity window is independent
/// of the URL's own expiry; serving it for up to this long is an accepted
/// tradeoff.
pub const SIGNED_URL_TTL_SECONDS: u64 = 60;

/// Default maximum listing depth (count of `/` separators in a key).
pub const DEFAULT_LISTING_DEPTH: usize = 4;

/// How long generated signed URLs remain valid.
const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(60);

/// Keys containing this segment are known non-release artifacts and are
/// excluded from cached listings.
const UNPACKED_SEGMENT: &str = "unpacked/";

/// How long an idle pooled connection may linger before eviction.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache pool unavailable: {0}")]
    Pool(String),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

/// Raw key/value operations the cache layer needs from its backing store.
///
/// Object-safe so the policy layer can be exercised against an in-memory
/// store in tests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Delete every key matching a glob-style pattern; returns the count
    /// removed.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Redis implementation backed by a bounded `bb8` connection pool.
///
/// Pool exhaustion queues the acquiring request until a connection frees up
/// or the pool's connection timeout elapses.
pub struct RedisStore {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisStore {
    /// Connect to Redis at `url` with the given pool bounds.
    pub async fn connect(url: &str, min_idle: u32, max_size: u32) -> Result<Self, CacheError> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = bb8::Pool::builder()
            .min_idle(Some(min_idle))
            .max_size(max_size)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .build(manager)
            .await?;

        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::Pool(err.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}

/// Read-through cache-aside policy over an [`ObjectStore`] and a
/// [`CacheStore`].
#[derive(Clone)]
pub struct CacheService {
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn ObjectStore>,
}

impl CacheService {
    pub fn new(cache: Arc<dyn CacheStore>, store: Arc<dyn ObjectStore>) -> Self {
        Self { cache, store }
    }

    /// Cache key for a filtered listing of `prefix` at `depth`.
    pub fn listing_key(prefix: &str, depth: usize) -> String {
        format!("listing-cache:{}:{}", prefix, depth)
    }

    /// Cache key for the signed URL of one resource path.
    pub fn signed_url_key(resource_path: &str) -> String {
        format!("signed-url-cache:{}", resource_path)
    }

    /// List objects under `prefix`, serving from cache when possible.
    ///
    /// On a miss the upstream listing is filtered to entries whose depth is
    /// at most `depth` and whose key does not contain `unpacked/`, then
    /// stored for [`LISTING_TTL_SECONDS`].
    pub async fn cached_list_objects(
        &self,
        prefix: &str,
        depth: usize,
    ) -> Result<Vec<ObjectEntry>, ApiError> {
        let cache_key = Self::listing_key(prefix, depth);

        if let Some(cached) = self.read(&cache_key).await {
            match serde_json::from_str::<Vec<ObjectEntry>>(&cached) {
                Ok(entries) => {
                    info!(key = %cache_key, "cache: using existing cache key");
                    return Ok(entries);
                }
                Err(err) => {
                    warn!(key = %cache_key, error = %err, "discarding undecodable cache entry");
                }
            }
        }

        let entries = self.store.list_objects(prefix).await?;
        let filtered: Vec<ObjectEntry> = entries
            .into_iter()
            .filter(|entry| entry.depth() <= depth && !entry.key.contains(UNPACKED_SEGMENT))
            .collect();

        match serde_json::to_string(&filtered) {
            Ok(payload) => {
                self.write(&cache_key, &payload, LISTING_TTL_SECONDS).await;
                info!(key = %cache_key, "cache: creating a new cache key");
            }
            Err(err) => warn!(key = %cache_key, error = %err, "listing not cacheable"),
        }

        Ok(filtered)
    }

    /// Resolve the signed URL for `resource_path`, serving from cache when
    /// possible. Misses generate a fresh URL and store it for
    /// [`SIGNED_URL_TTL_SECONDS`].
    pub async fn cached_signed_url(&self, resource_path: &str) -> Result<String, ApiError> {
        let cache_key = Self::signed_url_key(resource_path);

        if let Some(url) = self.read(&cache_key).await {
            info!(key = %cache_key, "cache: using existing signed URL");
            return Ok(url);
        }

        let url = self.store.signed_url(resource_path, SIGNED_URL_EXPIRY).await?;
        self.write(&cache_key, &url, SIGNED_URL_TTL_SECONDS).await;
        info!(key = %cache_key, "cache: creating a new cache entry for signed URL");

        Ok(url)
    }

    /// Delete every cache entry matching `pattern`; returns the count
    /// removed. Zero is a valid, non-error outcome.
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, ApiError> {
        self.cache.delete_matching(pattern).await.map_err(|err| {
            warn!(pattern, error = %err, "cache invalidation failed");
            ApiError::Internal
        })
    }

    /// Probe the backing store, for readiness checks.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.cache.ping().await.map_err(|err| {
            warn!(error = %err, "cache ping failed");
            ApiError::Internal
        })
    }

    /// Best-effort cache read: errors degrade to a miss.
    async fn read(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Best-effort cache write: errors are logged and swallowed.
    async fn write(&self, key: &str, value: &str, ttl_seconds: u64) {
        if let Err(err) = self.cache.set_ex(key, value, ttl_seconds).await {
            warn!(key, error = %err, "cache write failed");
        }
    }
}
