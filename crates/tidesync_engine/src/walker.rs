//! Sorted depth-first local walker (restore direction).

use crate::enumerate::{send_discovery, Discovery};
use crate::error::{SyncError, SyncResult};
use crate::key::{Marker, ObjectKey};
use crate::queue::Locator;
use crate::signal::SignalState;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Walks the directory tree in sorted order, feeding file keys
/// downstream.
///
/// Children of every directory are visited in raw byte order of their
/// names, which makes the produced key sequence ascending under
/// [`ObjectKey`]'s segment ordering - the property the resume marker
/// depends on.
///
/// Resume: keys whose subtree the marker covers are pruned without
/// descending; the marker key itself is recognized but not re-registered.
/// An I/O failure during traversal aborts the run (the coordinator
/// receives [`Discovery::ListingFailed`]).
pub(crate) async fn run_walker(
    directory: PathBuf,
    marker: Marker,
    signals: Arc<SignalState>,
    tx: mpsc::Sender<Discovery>,
) {
    let mut walk = Walk {
        // With no marker there is nothing to skip; start registering at once.
        passed_marker: !marker.is_set(),
        marker,
        signals,
        tx,
    };

    if let Err(error) = walk.visit(&directory, String::new()).await {
        send_discovery(
            &walk.tx,
            &walk.signals,
            Discovery::ListingFailed { error },
        )
        .await;
    }
}

struct Walk {
    marker: Marker,
    passed_marker: bool,
    signals: Arc<SignalState>,
    tx: mpsc::Sender<Discovery>,
}

impl Walk {
    /// Recursive DFS. Boxed because async recursion needs an indirection.
    fn visit<'a>(
        &'a mut self,
        dir: &'a Path,
        parent_key: String,
    ) -> Pin<Box<dyn Future<Output = SyncResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut names = Vec::new();
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                names.push(entry.file_name());
            }
            names.sort();

            for name in names {
                if self.signals.register_stopped() {
                    return Ok(());
                }

                let Some(name) = name.to_str().map(String::from) else {
                    let discovery = Discovery::NonUtf8Name {
                        parent: parent_key.clone(),
                        raw: name.as_encoded_bytes().to_vec(),
                    };
                    if !send_discovery(&self.tx, &self.signals, discovery).await {
                        return Ok(());
                    }
                    continue;
                };

                let key_string = if parent_key.is_empty() {
                    name.clone()
                } else {
                    format!("{parent_key}/{name}")
                };
                let key = ObjectKey::new(key_string.clone());

                if self.marker.matches(&key) {
                    debug!(%key, "reached resume marker");
                    self.passed_marker = true;
                    continue;
                }
                if !self.passed_marker && self.marker.covers(&key) {
                    continue;
                }

                let path = dir.join(&name);
                let metadata = tokio::fs::metadata(&path).await?;
                if metadata.is_dir() {
                    self.visit(&path, key_string).await?;
                } else {
                    let discovery = Discovery::Item {
                        key,
                        locator: Locator::Path(path),
                    };
                    if !send_discovery(&self.tx, &self.signals, discovery).await {
                        return Ok(());
                    }
                }
            }
            Ok(())
        })
    }
}
