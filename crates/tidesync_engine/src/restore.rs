//! Restore: upload a local directory tree into the remote store.

use crate::config::{DualMetaFilter, KeyFilter, KeyMapper, RestoreOptions};
use crate::coordinator::{Coordinator, RunLimits};
use crate::enumerate::run_explicit;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventSender, Progress};
use crate::handle::SyncHandle;
use crate::key::{Marker, ObjectKey};
use crate::ledger::Resolution;
use crate::queue::Locator;
use crate::signal::{SignalState, SyncControl};
use crate::transfer::{resolve_under, Transfer};
use crate::walker::run_walker;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Starts a restore run: files under `options.directory` are uploaded
/// into the store under their tree-relative keys.
///
/// Returns immediately; progress arrives as events on the handle. Must
/// be called within a tokio runtime.
///
/// Filters resolve items as skipped before any bytes move; see
/// [`RestoreOptions::with_filter`] and
/// [`RestoreOptions::with_dual_meta_filter`].
pub fn restore<S: tidesync_store::ObjectStore>(
    store: Arc<S>,
    options: RestoreOptions,
) -> SyncHandle {
    let (events, event_rx) = EventSender::channel();
    let signals = Arc::new(SignalState::default());
    let (progress_tx, progress_rx) = watch::channel(Progress::default());
    let (discovery_tx, discovery_rx) = mpsc::channel(1);

    let limits = RunLimits {
        max_items: options.max_items,
        max_concurrency: options.max_concurrency.max(1),
        queue_limit: options.max_queue_depth.max(1),
        max_errors: options.max_errors,
        max_retries: options.max_retries,
    };

    match options.explicit_keys {
        Some(keys) => {
            tokio::spawn(run_explicit(keys, Arc::clone(&signals), discovery_tx));
        }
        None => {
            tokio::spawn(run_walker(
                options.directory.clone(),
                Marker::new(options.resume_marker),
                Arc::clone(&signals),
                discovery_tx,
            ));
        }
    }

    let transfer = Arc::new(UploadTransfer {
        store,
        directory: options.directory,
        mapper: options.key_mapper,
        filter: options.filter,
        dual_meta_filter: options.dual_meta_filter,
    });
    let coordinator = Coordinator::new(
        limits,
        transfer,
        events,
        Arc::clone(&signals),
        progress_tx,
    );
    let join = tokio::spawn(coordinator.run(discovery_rx));

    SyncHandle::new(event_rx, SyncControl::new(signals), progress_rx, join)
}

/// Uploads one local file into the store, after the filters have had
/// their say.
struct UploadTransfer<S> {
    store: Arc<S>,
    directory: PathBuf,
    mapper: Option<KeyMapper>,
    filter: Option<KeyFilter>,
    dual_meta_filter: Option<DualMetaFilter>,
}

impl<S: tidesync_store::ObjectStore> Transfer for UploadTransfer<S> {
    fn run(
        &self,
        key: &ObjectKey,
        locator: &Locator,
    ) -> impl Future<Output = SyncResult<Resolution>> + Send {
        async move {
            if let Some(filter) = &self.filter {
                if !filter(key.as_str()) {
                    return Ok(Resolution::Skipped);
                }
            }

            let path = match locator {
                Locator::Path(path) => path.clone(),
                // Explicit-keys runs derive the path from the key.
                Locator::FromKey => resolve_under(&self.directory, key.as_str())
                    .ok_or_else(|| SyncError::PathEscape {
                        key: key.to_string(),
                    })?,
            };

            let target = match &self.mapper {
                Some(mapper) => mapper(key.as_str()),
                None => key.as_str().to_string(),
            };

            if let Some(dual) = &self.dual_meta_filter {
                let local = tokio::fs::metadata(&path).await?;
                let remote = self.store.head(&target).await?;
                if !dual(&local, remote.as_ref()) {
                    return Ok(Resolution::Skipped);
                }
            }

            let body = tokio::fs::read(&path).await?;
            let content_type = guess_content_type(&target);
            self.store.put(&target, body, content_type).await?;
            Ok(Resolution::Created)
        }
    }
}

/// Guesses a MIME type from the destination key's extension.
///
/// Deliberately small; unknown extensions upload without a content
/// type, which stores treat as optional metadata.
fn guess_content_type(key: &str) -> Option<&'static str> {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext)?;
    let content_type = match extension {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "wasm" => "application/wasm",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tidesync_store::{MemoryStore, ObjectStore};

    fn transfer_over(
        dir: &TempDir,
        store: Arc<MemoryStore>,
    ) -> UploadTransfer<MemoryStore> {
        UploadTransfer {
            store,
            directory: dir.path().to_path_buf(),
            mapper: None,
            filter: None,
            dual_meta_filter: None,
        }
    }

    #[tokio::test]
    async fn upload_round_trip() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), b"{}").unwrap();
        let store = Arc::new(MemoryStore::new());

        let transfer = transfer_over(&dir, Arc::clone(&store));
        let resolution = transfer
            .run(
                &ObjectKey::new("a.json"),
                &Locator::Path(dir.path().join("a.json")),
            )
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Created);
        let object = store.get("a.json").await.unwrap();
        assert_eq!(object.body, b"{}");
        assert_eq!(
            object.meta.content_type.as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn key_filter_skips_without_io() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());

        let mut transfer = transfer_over(&dir, Arc::clone(&store));
        transfer.filter = Some(Arc::new(|key: &str| !key.ends_with(".tmp")));

        // The path does not even exist; the filter must fire first.
        let resolution = transfer
            .run(
                &ObjectKey::new("junk.tmp"),
                &Locator::Path(dir.path().join("junk.tmp")),
            )
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::Skipped);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn dual_meta_filter_sees_missing_remote_as_none() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let store = Arc::new(MemoryStore::new());

        let mut transfer = transfer_over(&dir, Arc::clone(&store));
        // Upload only when no remote object exists yet.
        transfer.dual_meta_filter = Some(Arc::new(|_local, remote| remote.is_none()));

        let locator = Locator::Path(dir.path().join("f"));
        let resolution = transfer.run(&ObjectKey::new("f"), &locator).await.unwrap();
        assert_eq!(resolution, Resolution::Created);

        // Second pass: the object now exists, so the filter skips it.
        let resolution = transfer.run(&ObjectKey::new("f"), &locator).await.unwrap();
        assert_eq!(resolution, Resolution::Skipped);
    }

    #[tokio::test]
    async fn mapper_renames_target_key() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let store = Arc::new(MemoryStore::new());

        let mut transfer = transfer_over(&dir, Arc::clone(&store));
        transfer.mapper = Some(Arc::new(|key: &str| format!("archive/{key}")));

        transfer
            .run(&ObjectKey::new("f"), &Locator::Path(dir.path().join("f")))
            .await
            .unwrap();
        assert!(store.contains_key("archive/f"));
        assert!(!store.contains_key("f"));
    }

    #[tokio::test]
    async fn missing_local_file_errors() {
        let dir = TempDir::new().unwrap();
        let transfer = transfer_over(&dir, Arc::new(MemoryStore::new()));
        let result = transfer
            .run(
                &ObjectKey::new("gone"),
                &Locator::Path(dir.path().join("gone")),
            )
            .await;
        assert!(matches!(result, Err(SyncError::Io(_))));
    }

    #[test]
    fn content_type_table() {
        assert_eq!(guess_content_type("a/b.json"), Some("application/json"));
        assert_eq!(guess_content_type("x.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("noext"), None);
        assert_eq!(guess_content_type("weird.xyz"), None);
    }
}
