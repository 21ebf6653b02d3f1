//! In-memory fakes for exercising the cache policy and query services
//! without a live Redis or object store.

use crate::{
    errors::ApiError,
    models::object::ObjectEntry,
    services::{
        cache::{CacheError, CacheStore},
        object_store::{ObjectDownload, ObjectStore},
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// A [`CacheStore`] over a plain map. TTLs are accepted and ignored; tests
/// exercising expiry-adjacent behavior clear entries explicitly.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    /// Number of individual keys deleted via `delete_matching`.
    pub deletions: AtomicUsize,
}

impl MemoryStore {
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl_seconds: u64) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let matched: Vec<String> = entries
            .keys()
            .filter(|key| glob_matches(pattern, key))
            .cloned()
            .collect();
        for key in &matched {
            entries.remove(key);
        }
        self.deletions.fetch_add(matched.len(), Ordering::SeqCst);
        Ok(matched.len() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Trailing-wildcard glob, the only shape the cache layer uses.
fn glob_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

/// An [`ObjectStore`] over a fixed entry list, counting upstream calls so
/// cache-hit properties are assertable.
pub struct FakeObjectStore {
    entries: Mutex<Vec<ObjectEntry>>,
    payload: Bytes,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub url_calls: AtomicUsize,
}

impl FakeObjectStore {
    pub fn new(entries: Vec<ObjectEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            payload: Bytes::from_static(b"installer-bytes"),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
        }
    }

    pub fn payload(&self) -> Bytes {
        self.payload.clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let matched: Vec<ObjectEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.key.starts_with(prefix))
            .cloned()
            .collect();

        // Mirrors the gateway policy: an empty prefix is an error.
        if matched.is_empty() {
            return Err(ApiError::Internal);
        }
        Ok(matched)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectDownload, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let exists = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.key == key);
        if !exists {
            return Err(ApiError::NotFound);
        }

        let payload = self.payload.clone();
        Ok(ObjectDownload {
            content_length: Some(payload.len() as i64),
            body: Some(stream::iter(vec![Ok(payload)]).boxed()),
        })
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> Result<String, ApiError> {
        let call = self.url_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "https://signed.example/{}?expires={}&generation={}",
            key,
            expires_in.as_secs(),
            call
        ))
    }
}
