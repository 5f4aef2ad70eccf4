//! Run options for the two sync directions.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tidesync_store::ObjectMeta;

/// Rewrites a source key into a destination key (or local name).
///
/// Defaults to identity when absent.
pub type KeyMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Decides whether a key should be transferred at all (restore only).
///
/// Returning false resolves the item as skipped without any I/O.
pub type KeyFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Compares local file metadata against the destination's existing
/// object metadata (restore only). `None` means no object exists yet.
///
/// Returning false resolves the item as skipped before any bytes move.
pub type DualMetaFilter =
    Arc<dyn Fn(&std::fs::Metadata, Option<&ObjectMeta>) -> bool + Send + Sync>;

/// Options for [`backup`](crate::backup) (remote store to local tree).
#[derive(Clone)]
pub struct BackupOptions {
    /// Local directory the mirror is written into.
    pub directory: PathBuf,
    /// Restrict the listing to keys with this prefix.
    pub prefix: Option<String>,
    /// Sync exactly these keys instead of listing the store.
    pub explicit_keys: Option<Vec<String>>,
    /// Maps an object key to a local relative path.
    pub key_mapper: Option<KeyMapper>,
    /// Stop registering after this many items.
    pub max_items: u64,
    /// Concurrent transfer limit.
    pub max_concurrency: usize,
    /// Abort after this many failures.
    pub max_errors: u64,
    /// Per-item (and per-listing-page) retry budget.
    pub max_retries: u32,
    /// Resume after this key (exclusive), as persisted from a previous
    /// run's `MoveOn` events.
    pub resume_marker: Option<String>,
    /// Listing page size.
    pub list_page_size: usize,
}

impl BackupOptions {
    /// Creates options targeting `directory` with the defaults:
    /// concurrency 10, 3 retries, unlimited items and errors.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: None,
            explicit_keys: None,
            key_mapper: None,
            max_items: u64::MAX,
            max_concurrency: 10,
            max_errors: u64::MAX,
            max_retries: 3,
            resume_marker: None,
            list_page_size: 1000,
        }
    }

    /// Sets the listing prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Supplies an explicit key list, bypassing the listing walk.
    #[must_use]
    pub fn with_explicit_keys(mut self, keys: Vec<String>) -> Self {
        self.explicit_keys = Some(keys);
        self
    }

    /// Sets the key mapper.
    #[must_use]
    pub fn with_key_mapper(mut self, mapper: KeyMapper) -> Self {
        self.key_mapper = Some(mapper);
        self
    }

    /// Caps the number of registered items.
    #[must_use]
    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the concurrent transfer limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the abort threshold on accumulated failures.
    #[must_use]
    pub fn with_max_errors(mut self, max_errors: u64) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Sets the per-item retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Resumes after a previously persisted cursor key.
    #[must_use]
    pub fn with_resume_marker(mut self, marker: impl Into<String>) -> Self {
        self.resume_marker = Some(marker.into());
        self
    }

    /// Sets the listing page size.
    #[must_use]
    pub fn with_list_page_size(mut self, list_page_size: usize) -> Self {
        self.list_page_size = list_page_size;
        self
    }
}

impl fmt::Debug for BackupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupOptions")
            .field("directory", &self.directory)
            .field("prefix", &self.prefix)
            .field("explicit_keys", &self.explicit_keys.as_ref().map(Vec::len))
            .field("key_mapper", &self.key_mapper.as_ref().map(|_| "fn"))
            .field("max_items", &self.max_items)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_errors", &self.max_errors)
            .field("max_retries", &self.max_retries)
            .field("resume_marker", &self.resume_marker)
            .field("list_page_size", &self.list_page_size)
            .finish()
    }
}

/// Options for [`restore`](crate::restore) (local tree to remote store).
#[derive(Clone)]
pub struct RestoreOptions {
    /// Local directory the mirror is read from.
    pub directory: PathBuf,
    /// Sync exactly these keys (relative to `directory`) instead of
    /// walking the tree.
    pub explicit_keys: Option<Vec<String>>,
    /// Maps a local key to the destination object key.
    pub key_mapper: Option<KeyMapper>,
    /// Key-only skip predicate.
    pub filter: Option<KeyFilter>,
    /// Local/remote metadata comparison predicate.
    pub dual_meta_filter: Option<DualMetaFilter>,
    /// Stop registering after this many items.
    pub max_items: u64,
    /// Concurrent transfer limit.
    pub max_concurrency: usize,
    /// Registration suspends while this many items are waiting.
    pub max_queue_depth: usize,
    /// Abort after this many failures.
    pub max_errors: u64,
    /// Per-item retry budget.
    pub max_retries: u32,
    /// Resume after this key, as persisted from a previous run's
    /// `MoveOn` events; whole already-covered subtrees are pruned.
    pub resume_marker: Option<String>,
}

impl RestoreOptions {
    /// Creates options reading from `directory` with the defaults:
    /// concurrency 3, queue depth 1000, 3 retries, unlimited items and
    /// errors.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            explicit_keys: None,
            key_mapper: None,
            filter: None,
            dual_meta_filter: None,
            max_items: u64::MAX,
            max_concurrency: 3,
            max_queue_depth: 1000,
            max_errors: u64::MAX,
            max_retries: 3,
            resume_marker: None,
        }
    }

    /// Supplies an explicit key list, bypassing the directory walk.
    #[must_use]
    pub fn with_explicit_keys(mut self, keys: Vec<String>) -> Self {
        self.explicit_keys = Some(keys);
        self
    }

    /// Sets the key mapper.
    #[must_use]
    pub fn with_key_mapper(mut self, mapper: KeyMapper) -> Self {
        self.key_mapper = Some(mapper);
        self
    }

    /// Sets the key-only skip predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: KeyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the local/remote metadata predicate.
    #[must_use]
    pub fn with_dual_meta_filter(mut self, filter: DualMetaFilter) -> Self {
        self.dual_meta_filter = Some(filter);
        self
    }

    /// Caps the number of registered items.
    #[must_use]
    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the concurrent transfer limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the waiting-queue bound that suspends registration.
    #[must_use]
    pub fn with_max_queue_depth(mut self, max_queue_depth: usize) -> Self {
        self.max_queue_depth = max_queue_depth;
        self
    }

    /// Sets the abort threshold on accumulated failures.
    #[must_use]
    pub fn with_max_errors(mut self, max_errors: u64) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Sets the per-item retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Resumes after a previously persisted cursor key.
    #[must_use]
    pub fn with_resume_marker(mut self, marker: impl Into<String>) -> Self {
        self.resume_marker = Some(marker.into());
        self
    }
}

impl fmt::Debug for RestoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreOptions")
            .field("directory", &self.directory)
            .field("explicit_keys", &self.explicit_keys.as_ref().map(Vec::len))
            .field("key_mapper", &self.key_mapper.as_ref().map(|_| "fn"))
            .field("filter", &self.filter.as_ref().map(|_| "fn"))
            .field(
                "dual_meta_filter",
                &self.dual_meta_filter.as_ref().map(|_| "fn"),
            )
            .field("max_items", &self.max_items)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_queue_depth", &self.max_queue_depth)
            .field("max_errors", &self.max_errors)
            .field("max_retries", &self.max_retries)
            .field("resume_marker", &self.resume_marker)
            .finish()
    }
}
