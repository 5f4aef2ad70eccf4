//! Backup: mirror the remote store into a local directory.

use crate::config::{BackupOptions, KeyMapper};
use crate::coordinator::{Coordinator, RunLimits};
use crate::enumerate::run_explicit;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventSender, Progress};
use crate::handle::SyncHandle;
use crate::key::ObjectKey;
use crate::ledger::Resolution;
use crate::lister::run_lister;
use crate::queue::Locator;
use crate::signal::{SignalState, SyncControl};
use crate::transfer::{resolve_under, Transfer};
use filetime::FileTime;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Starts a backup run: the store's objects are downloaded into
/// `options.directory`, preserving each object's modification time.
///
/// Returns immediately; progress arrives as events on the handle. Must
/// be called within a tokio runtime.
///
/// Directory-marker keys (trailing '/') carry no content and resolve as
/// ignored without touching the store.
pub fn backup<S: tidesync_store::ObjectStore>(store: Arc<S>, options: BackupOptions) -> SyncHandle {
    let (events, event_rx) = EventSender::channel();
    let signals = Arc::new(SignalState::default());
    let (progress_tx, progress_rx) = watch::channel(Progress::default());
    let (discovery_tx, discovery_rx) = mpsc::channel(1);

    let page_size = options.list_page_size.max(1);
    let limits = RunLimits {
        max_items: options.max_items,
        max_concurrency: options.max_concurrency.max(1),
        // The lister pauses once a backlog of a few pages builds up.
        queue_limit: page_size.saturating_mul(10),
        max_errors: options.max_errors,
        max_retries: options.max_retries,
    };

    match options.explicit_keys {
        Some(keys) => {
            tokio::spawn(run_explicit(keys, Arc::clone(&signals), discovery_tx));
        }
        None => {
            tokio::spawn(run_lister(
                Arc::clone(&store),
                options.prefix,
                options.resume_marker,
                page_size,
                options.max_retries,
                Arc::clone(&signals),
                discovery_tx,
            ));
        }
    }

    let transfer = Arc::new(DownloadTransfer {
        store,
        directory: options.directory,
        mapper: options.key_mapper,
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

/// Downloads one object and writes it under the local directory.
struct DownloadTransfer<S> {
    store: Arc<S>,
    directory: PathBuf,
    mapper: Option<KeyMapper>,
}

impl<S: tidesync_store::ObjectStore> Transfer for DownloadTransfer<S> {
    fn run(
        &self,
        key: &ObjectKey,
        _locator: &Locator,
    ) -> impl Future<Output = SyncResult<Resolution>> + Send {
        async move {
            if key.is_dir_marker() {
                return Ok(Resolution::Ignored);
            }

            let local_name = match &self.mapper {
                Some(mapper) => mapper(key.as_str()),
                None => key.as_str().to_string(),
            };
            let path = resolve_under(&self.directory, &local_name)
                .ok_or_else(|| SyncError::PathEscape {
                    key: key.to_string(),
                })?;

            let object = self.store.get(key.as_str()).await?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &object.body).await?;

            let mtime = FileTime::from_system_time(object.meta.last_modified);
            filetime::set_file_times(&path, mtime, mtime)?;

            Ok(Resolution::Created)
        }
    }
}
