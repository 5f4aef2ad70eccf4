//! In-memory object store for testing.

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectMeta, ObjectPage, StoredObject};
use crate::store::ObjectStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::{ready, Future};
use std::time::SystemTime;

/// An in-memory object store.
///
/// Objects live in a sorted map, so listings come back in the same key
/// order a real bucket would produce. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral mirrors that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across tasks.
///
/// # Example
///
/// ```rust
/// use tidesync_store::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.insert("docs/readme.md", b"hello".to_vec());
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated from `(key, body)` pairs.
    pub fn with_objects<K, I>(objects: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Vec<u8>)>,
    {
        let store = Self::new();
        for (key, body) in objects {
            store.insert(key, body);
        }
        store
    }

    /// Inserts an object, stamping the current time.
    pub fn insert(&self, key: impl Into<String>, body: Vec<u8>) {
        self.insert_at(key, body, SystemTime::now());
    }

    /// Inserts an object with an explicit modification time.
    ///
    /// Useful for testing time-based filters.
    pub fn insert_at(&self, key: impl Into<String>, body: Vec<u8>, last_modified: SystemTime) {
        let key = key.into();
        let meta = ObjectMeta::new(key.clone(), body.len() as u64).with_last_modified(last_modified);
        self.objects
            .write()
            .insert(key, StoredObject { meta, body });
    }

    /// Removes an object, returning true if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().remove(key).is_some()
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Returns all keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Returns true if the key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Returns a copy of an object's body, if present.
    #[must_use]
    pub fn body(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().get(key).map(|o| o.body.clone())
    }

    fn list_sync(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> StoreResult<ObjectPage> {
        let objects = self.objects.read();

        let range = match start_after {
            Some(marker) => objects.range::<str, _>((
                std::ops::Bound::Excluded(marker),
                std::ops::Bound::Unbounded,
            )),
            None => objects.range::<str, _>(..),
        };

        let mut page = ObjectPage::default();
        for (key, object) in range {
            if let Some(p) = prefix {
                if !key.starts_with(p) {
                    if key.as_str() < p {
                        continue;
                    }
                    // Keys are sorted, so nothing later can match either.
                    break;
                }
            }
            if page.objects.len() == max_keys {
                page.truncated = true;
                break;
            }
            page.objects.push(object.meta.clone());
        }
        Ok(page)
    }
}

impl ObjectStore for MemoryStore {
    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> impl Future<Output = StoreResult<ObjectPage>> + Send {
        ready(self.list_sync(prefix, start_after, max_keys))
    }

    fn get(&self, key: &str) -> impl Future<Output = StoreResult<StoredObject>> + Send {
        let result = self
            .objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: key.into() });
        ready(result)
    }

    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let mut meta = ObjectMeta::new(key, body.len() as u64);
        if let Some(ct) = content_type {
            meta = meta.with_content_type(ct);
        }
        self.objects
            .write()
            .insert(key.into(), StoredObject { meta, body });
        ready(Ok(()))
    }

    fn head(&self, key: &str) -> impl Future<Output = StoreResult<Option<ObjectMeta>>> + Send {
        let meta = self.objects.read().get(key).map(|o| o.meta.clone());
        ready(Ok(meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_abc() -> MemoryStore {
        MemoryStore::with_objects([
            ("a/1", b"one".to_vec()),
            ("a/2", b"two".to_vec()),
            ("b/1", b"three".to_vec()),
        ])
    }

    #[tokio::test]
    async fn put_then_get_round_trip() {
        let store = MemoryStore::new();
        store.put("x/y", b"data".to_vec(), Some("text/plain")).await.unwrap();

        let object = store.get("x/y").await.unwrap();
        assert_eq!(object.body, b"data");
        assert_eq!(object.meta.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.meta.size, 4);
    }

    #[tokio::test]
    async fn get_missing_key_fails() {
        let store = MemoryStore::new();
        let result = store.get("missing").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn head_missing_key_is_none() {
        let store = store_abc();
        assert!(store.head("a/1").await.unwrap().is_some());
        assert!(store.head("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let store = store_abc();
        let page = store.list(None, None, 10).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["a/1", "a/2", "b/1"]);
        assert!(!page.truncated);
    }

    #[tokio::test]
    async fn list_respects_prefix() {
        let store = store_abc();
        let page = store.list(Some("a/"), None, 10).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["a/1", "a/2"]);
    }

    #[tokio::test]
    async fn list_marker_is_exclusive() {
        let store = store_abc();
        let page = store.list(None, Some("a/1"), 10).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, ["a/2", "b/1"]);
    }

    #[tokio::test]
    async fn list_truncation() {
        let store = store_abc();
        let page = store.list(None, None, 2).await.unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.truncated);
        assert_eq!(page.last_key(), Some("a/2"));

        let page = store.list(None, page.last_key(), 2).await.unwrap();
        assert_eq!(page.objects.len(), 1);
        assert!(!page.truncated);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = MemoryStore::new();
        store.put("k", b"old".to_vec(), None).await.unwrap();
        store.put("k", b"new".to_vec(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().body, b"new");
        assert_eq!(store.len(), 1);
    }
}
