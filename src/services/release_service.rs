//! Release Query Service — orchestrates the cache layer, object-store
//! gateway, and release parser to answer listing, latest, and by-id queries,
//! and owns the cache-clear authorization.

use crate::{
    errors::ApiError,
    models::release::{Release, ReleaseList},
    services::{
        cache::{CacheService, CacheStore, DEFAULT_LISTING_DEPTH},
        object_store::{ObjectDownload, ObjectStore},
        parser,
    },
};
use std::sync::Arc;
use tracing::info;

/// Shared handler state: owns the cache policy, a handle to the object
/// store for the proxy path, the releases key prefix, and the cache-clear
/// bearer secret. Cloning is cheap; all heavy members are behind `Arc`.
#[derive(Clone)]
pub struct ReleaseService {
    cache: CacheService,
    store: Arc<dyn ObjectStore>,
    releases_prefix: String,
    auth_secret: String,
}

impl ReleaseService {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn ObjectStore>,
        releases_prefix: impl Into<String>,
        auth_secret: impl Into<String>,
    ) -> Self {
        Self {
            cache: CacheService::new(cache, store.clone()),
            store,
            releases_prefix: releases_prefix.into(),
            auth_secret: auth_secret.into(),
        }
    }

    /// List all releases under the configured prefix, oldest first.
    pub async fn list_releases(&self) -> Result<ReleaseList, ApiError> {
        let entries = self
            .cache
            .cached_list_objects(&self.releases_prefix, DEFAULT_LISTING_DEPTH)
            .await?;
        Ok(parser::parse_release_list(&entries))
    }

    /// The release with the maximum timestamp. An empty parsed list is a
    /// defined "no releases" outcome: `NotFound`.
    pub async fn latest_release(&self) -> Result<Release, ApiError> {
        let list = self.list_releases().await?;
        list.releases
            .into_iter()
            .max_by_key(|release| release.timestamp)
            .ok_or(ApiError::NotFound)
    }

    /// One release by identifier, via a single-group listing of its prefix.
    pub async fn release_by_id(&self, id: &str) -> Result<Release, ApiError> {
        let prefix = format!("{}{}", self.releases_prefix, id);
        let entries = self
            .cache
            .cached_list_objects(&prefix, DEFAULT_LISTING_DEPTH)
            .await?;
        parser::parse_release(&entries)
    }

    /// Object key for one asset, per the fixed
    /// `<prefix>/<releaseId>/<os>/<filename>` layout.
    pub fn asset_key(&self, id: &str, os: &str, filename: &str) -> String {
        format!("{}{}/{}/{}", self.releases_prefix, id, os, filename)
    }

    /// Signed URL for the redirect download path, cache-aside.
    pub async fn signed_download_url(&self, key: &str) -> Result<String, ApiError> {
        self.cache.cached_signed_url(key).await
    }

    /// Fetch an asset for the streaming proxy path. Bypasses the cache:
    /// binary payloads are never cached, only listings and URLs are.
    pub async fn fetch_asset(&self, key: &str) -> Result<ObjectDownload, ApiError> {
        self.store.get_object(key).await
    }

    /// Clear cached release listings.
    ///
    /// Requires an exact `Bearer <secret>` match; any mismatch or absence is
    /// `Unauthorized` before any cache operation runs. Returns a human
    /// readable summary; removing zero entries is a valid outcome.
    pub async fn clear_cache(&self, authorization: Option<&str>) -> Result<String, ApiError> {
        let expected = format!("Bearer {}", self.auth_secret);
        if authorization != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }

        let pattern = format!("listing-cache:{}*", self.releases_prefix);
        let removed = self.cache.invalidate(&pattern).await?;

        let message = if removed > 0 {
            format!(
                "Cleared {} cache entries for keys starting with \"{}\".",
                removed, pattern
            )
        } else {
            format!("No cache keys found matching pattern \"{}\".", pattern)
        };
        info!(cache = %message);

        Ok(message)
    }

    /// Readiness probe against the cache connection.
    pub async fn cache_ping(&self) -> Result<(), ApiError> {
        self.cache.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::object::ObjectEntry,
        services::testing::{FakeObjectStore, MemoryStore},
    };
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    const SECRET: &str = "swordfish";

    fn entry(key: &str, ts: i64) -> ObjectEntry {
        ObjectEntry {
            key: key.to_string(),
            last_modified: Utc.timestamp_opt(ts, 0).unwrap(),
            size: 4096,
        }
    }

    fn service_with(
        entries: Vec<ObjectEntry>,
    ) -> (ReleaseService, Arc<MemoryStore>, Arc<FakeObjectStore>) {
        let cache = Arc::new(MemoryStore::default());
        let store = Arc::new(FakeObjectStore::new(entries));
        let service = ReleaseService::new(
            cache.clone(),
            store.clone(),
            "download/releases/",
            SECRET,
        );
        (service, cache, store)
    }

    #[tokio::test]
    async fn lists_releases_in_ascending_timestamp_order() {
        let (service, _, _) = service_with(vec![
            entry("download/releases/bbb2222/linux/app.deb", 200),
            entry("download/releases/aaa1111/linux/app.deb", 100),
            entry("download/releases/ccc3333/windows/app.exe", 300),
        ]);

        let list = service.list_releases().await.unwrap();
        assert_eq!(list.total, 3);
        let ids: Vec<&str> = list.releases.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["aaa1111", "bbb2222", "ccc3333"]);
    }

    #[tokio::test]
    async fn latest_release_takes_the_maximum_timestamp() {
        let (service, _, _) = service_with(vec![
            entry("download/releases/aaa1111/linux/app.deb", 100),
            entry("download/releases/ccc3333/windows/app.exe", 300),
            entry("download/releases/bbb2222/linux/app.deb", 200),
        ]);

        let latest = service.latest_release().await.unwrap();
        assert_eq!(latest.id, "ccc3333");
    }

    #[tokio::test]
    async fn latest_release_reports_not_found_when_nothing_parses() {
        // The listing succeeds but no entry yields a release id, so the
        // parsed list is empty.
        let (service, _, _) = service_with(vec![entry("download/releases/", 100)]);

        let err = service.latest_release().await.unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }

    #[tokio::test]
    async fn fetches_one_release_by_id() {
        let (service, _, _) = service_with(vec![
            entry("download/releases/abc1234/linux/app.deb", 100),
            entry("download/releases/abc1234/macos/app.dmg", 100),
            entry("download/releases/zzz9999/linux/app.deb", 200),
        ]);

        let release = service.release_by_id("abc1234").await.unwrap();
        assert_eq!(release.id, "abc1234");
        assert_eq!(release.assets.linux.deb.as_deref(), Some("app.deb"));
        assert_eq!(release.assets.macos.dmg.as_deref(), Some("app.dmg"));
    }

    #[tokio::test]
    async fn clear_cache_requires_the_exact_bearer_token() {
        let (service, cache, _) = service_with(vec![entry(
            "download/releases/abc1234/linux/app.deb",
            100,
        )]);
        // Populate the listing cache first.
        service.list_releases().await.unwrap();

        for bad in [None, Some("Bearer wrong"), Some(SECRET)] {
            let err = service.clear_cache(bad).await.unwrap_err();
            assert_eq!(err, ApiError::Unauthorized);
        }
        assert_eq!(cache.deletions.load(Ordering::SeqCst), 0);

        let token = format!("Bearer {}", SECRET);
        let message = service.clear_cache(Some(&token)).await.unwrap();
        assert!(message.starts_with("Cleared 1 cache entries"));
        assert_eq!(cache.deletions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_cache_with_no_matches_is_not_an_error() {
        let (service, _, _) = service_with(vec![]);
        let token = format!("Bearer {}", SECRET);
        let message = service.clear_cache(Some(&token)).await.unwrap();
        assert!(message.starts_with("No cache keys found"));
    }

    #[tokio::test]
    async fn asset_keys_follow_the_fixed_layout() {
        let (service, _, _) = service_with(vec![]);
        assert_eq!(
            service.asset_key("abc1234", "linux", "app.deb"),
            "download/releases/abc1234/linux/app.deb"
        );
    }

    #[tokio::test]
    async fn listing_twice_issues_one_upstream_call() {
        let (service, _, store) = service_with(vec![entry(
            "download/releases/abc1234/linux/app.deb",
            100,
        )]);

        let first = service.list_releases().await.unwrap();
        let second = service.list_releases().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }
}
