//! Remote-listing enumerator (backup direction).

use crate::enumerate::{send_discovery, Discovery};
use crate::error::SyncError;
use crate::key::ObjectKey;
use crate::queue::Locator;
use crate::signal::SignalState;
use std::sync::Arc;
use tidesync_store::ObjectStore;
use tokio::sync::mpsc;
use tracing::debug;

/// Pages through the store and feeds every listed key downstream.
///
/// The marker advances over each registered key, so a retried page
/// request never re-lists what was already handed to the coordinator.
/// Each failed attempt is reported as a [`Discovery::ListingError`]
/// (it counts toward the run's error breaker); when the per-page retry
/// budget runs out a [`Discovery::ListingFailed`] aborts the run.
pub(crate) async fn run_lister<S: ObjectStore>(
    store: Arc<S>,
    prefix: Option<String>,
    resume_marker: Option<String>,
    page_size: usize,
    max_retries: u32,
    signals: Arc<SignalState>,
    tx: mpsc::Sender<Discovery>,
) {
    let mut marker = resume_marker;
    let mut attempts_left = max_retries;

    loop {
        if signals.register_stopped() {
            return;
        }

        match store
            .list(prefix.as_deref(), marker.as_deref(), page_size)
            .await
        {
            Ok(page) => {
                // The budget is per page request, as a fresh page starts
                // a fresh retry chain.
                attempts_left = max_retries;

                if page.objects.is_empty() {
                    debug!(?marker, "listing exhausted");
                    return;
                }
                let truncated = page.truncated;
                for meta in page.objects {
                    marker = Some(meta.key.clone());
                    let discovery = Discovery::Item {
                        key: ObjectKey::new(meta.key),
                        locator: Locator::FromKey,
                    };
                    if !send_discovery(&tx, &signals, discovery).await {
                        return;
                    }
                }
                if !truncated {
                    return;
                }
            }
            Err(e) => {
                let exhausted = attempts_left == 0;
                let error = SyncError::Store(e);
                if exhausted {
                    let attempts = max_retries + 1;
                    let message = error.to_string();
                    send_discovery(&tx, &signals, Discovery::ListingError { error }).await;
                    send_discovery(
                        &tx,
                        &signals,
                        Discovery::ListingFailed {
                            error: SyncError::EnumerationFailed { attempts, message },
                        },
                    )
                    .await;
                    return;
                }
                attempts_left -= 1;
                if !send_discovery(&tx, &signals, Discovery::ListingError { error }).await {
                    return;
                }
            }
        }
    }
}
