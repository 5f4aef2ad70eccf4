//! Directory-backed object store.

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectMeta, ObjectPage, StoredObject};
use crate::store::ObjectStore;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// A local directory tree posing as a bucket.
///
/// Every '/'-segment of a key maps to a path component under the root,
/// so `docs/a.md` lives at `<root>/docs/a.md`. This makes a bucket
/// mirror inspectable with ordinary shell tools and lets the CLI run
/// without network credentials.
///
/// Directory-marker keys (trailing '/') are accepted by [`ObjectStore::put`]
/// with an empty body and materialize as directories; they are not listed
/// and cannot be fetched.
///
/// # Example
///
/// ```no_run
/// use tidesync_store::DirStore;
/// use std::path::Path;
///
/// let store = DirStore::open_with_create(Path::new("/var/mirror/bucket")).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Opens a store over an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist or is not a directory.
    pub fn open(root: &Path) -> StoreResult<Self> {
        let meta = std::fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Opens a store, creating the root directory if needed.
    pub fn open_with_create(root: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(root)?;
        Self::open(root)
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to its path under the root, rejecting traversal.
    fn key_path(&self, key: &str) -> StoreResult<PathBuf> {
        let trimmed = key.strip_suffix('/').unwrap_or(key);
        if trimmed.is_empty() {
            return Err(StoreError::InvalidKey(key.into()));
        }
        let mut path = self.root.clone();
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StoreError::InvalidKey(key.into()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn walk_sorted(root: &Path) -> io::Result<Vec<(String, std::fs::Metadata)>> {
        fn visit(
            dir: &Path,
            parent: &str,
            out: &mut Vec<(String, std::fs::Metadata)>,
        ) -> io::Result<()> {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let Some(name) = entry.file_name().to_str().map(String::from) else {
                    // Not representable as a key; unreachable for trees
                    // written through this store.
                    continue;
                };
                let key = if parent.is_empty() {
                    name
                } else {
                    format!("{parent}/{name}")
                };
                let meta = entry.metadata()?;
                if meta.is_dir() {
                    visit(&entry.path(), &key, out)?;
                } else {
                    out.push((key, meta));
                }
            }
            Ok(())
        }

        let mut out = Vec::new();
        visit(root, "", &mut out)?;
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

impl ObjectStore for DirStore {
    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> impl Future<Output = StoreResult<ObjectPage>> + Send {
        let root = self.root.clone();
        let prefix = prefix.map(String::from);
        let start_after = start_after.map(String::from);
        async move {
            let entries = tokio::task::spawn_blocking(move || Self::walk_sorted(&root))
                .await
                .map_err(|e| StoreError::unavailable_fatal(format!("listing task failed: {e}")))??;

            let mut page = ObjectPage::default();
            for (key, fs_meta) in entries {
                if let Some(marker) = &start_after {
                    if key.as_str() <= marker.as_str() {
                        continue;
                    }
                }
                if let Some(p) = &prefix {
                    if !key.starts_with(p.as_str()) {
                        continue;
                    }
                }
                if page.objects.len() == max_keys {
                    page.truncated = true;
                    break;
                }
                let last_modified = fs_meta.modified()?;
                page.objects.push(
                    ObjectMeta::new(key, fs_meta.len()).with_last_modified(last_modified),
                );
            }
            Ok(page)
        }
    }

    fn get(&self, key: &str) -> impl Future<Output = StoreResult<StoredObject>> + Send {
        let path = self.key_path(key);
        let key = key.to_string();
        async move {
            if key.ends_with('/') {
                return Err(StoreError::NotFound { key });
            }
            let path = path?;
            let body = match tokio::fs::read(&path).await {
                Ok(body) => body,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(StoreError::NotFound { key });
                }
                Err(e) => return Err(e.into()),
            };
            let fs_meta = tokio::fs::metadata(&path).await?;
            let meta = ObjectMeta::new(key, body.len() as u64)
                .with_last_modified(fs_meta.modified()?);
            Ok(StoredObject { meta, body })
        }
    }

    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let path = self.key_path(key);
        let is_marker = key.ends_with('/');
        async move {
            let path = path?;
            if is_marker {
                tokio::fs::create_dir_all(&path).await?;
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, body).await?;
            Ok(())
        }
    }

    fn head(&self, key: &str) -> impl Future<Output = StoreResult<Option<ObjectMeta>>> + Send {
        let path = self.key_path(key);
        let key = key.to_string();
        async move {
            if key.ends_with('/') {
                return Ok(None);
            }
            let path = path?;
            match tokio::fs::metadata(&path).await {
                Ok(fs_meta) if fs_meta.is_file() => Ok(Some(
                    ObjectMeta::new(key, fs_meta.len()).with_last_modified(fs_meta.modified()?),
                )),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
    }
}
