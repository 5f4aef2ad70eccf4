//! Object store trait definition.

use crate::error::StoreResult;
use crate::object::{ObjectMeta, ObjectPage, StoredObject};
use std::future::Future;

/// A bucket-scoped object store.
///
/// A store instance is constructed over one bucket (or an emulation of
/// one) and speaks '/'-delimited keys. Writes are idempotent overwrites;
/// there is no cross-key transaction.
///
/// # Invariants
///
/// - `list` returns keys in ascending lexicographic order and never
///   returns a key less than or equal to `start_after`
/// - `put` followed by `get` of the same key returns the written body
/// - `head` of a missing key is `Ok(None)`, not an error
///
/// # Implementors
///
/// - [`super::MemoryStore`] - for tests and ephemeral use
/// - [`super::DirStore`] - a local directory tree posing as a bucket
pub trait ObjectStore: Send + Sync + 'static {
    /// Lists up to `max_keys` objects after `start_after` (exclusive),
    /// restricted to keys beginning with `prefix` when given.
    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> impl Future<Output = StoreResult<ObjectPage>> + Send;

    /// Fetches an object's metadata and body.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// key does not exist.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<StoredObject>> + Send;

    /// Writes an object, overwriting any existing body under the key.
    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Fetches an object's metadata without its body.
    ///
    /// A missing key yields `Ok(None)`.
    fn head(&self, key: &str) -> impl Future<Output = StoreResult<Option<ObjectMeta>>> + Send;
}
