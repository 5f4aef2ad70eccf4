//! Caller-facing handle for a running sync.

use crate::events::{Progress, SyncEvent, SyncStats};
use crate::signal::SyncControl;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A running backup or restore.
///
/// The handle is the only connection to the engine: events stream out
/// of it, control signals go in through it, and [`SyncHandle::join`]
/// waits for the run to finish.
///
/// # Example
///
/// ```no_run
/// use tidesync_engine::{backup, BackupOptions, SyncEvent};
/// use tidesync_store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn demo() {
/// let store = Arc::new(MemoryStore::new());
/// let mut handle = backup(store, BackupOptions::new("/var/mirror"));
///
/// while let Some(event) = handle.next_event().await {
///     if let SyncEvent::MoveOn { key } = &event {
///         // Persist `key`; it is the crash-resume marker.
///     }
///     if matches!(event, SyncEvent::End { .. }) {
///         break;
///     }
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct SyncHandle {
    events: mpsc::UnboundedReceiver<SyncEvent>,
    control: SyncControl,
    progress: watch::Receiver<Progress>,
    join: JoinHandle<SyncStats>,
}

impl SyncHandle {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<SyncEvent>,
        control: SyncControl,
        progress: watch::Receiver<Progress>,
        join: JoinHandle<SyncStats>,
    ) -> Self {
        Self {
            events,
            control,
            progress,
            join,
        }
    }

    /// Receives the next event; `None` after [`SyncEvent::End`] has
    /// been consumed and the engine shut down.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Returns a cloneable control handle.
    #[must_use]
    pub fn control(&self) -> SyncControl {
        self.control.clone()
    }

    /// Stops discovering new items; queued and in-flight work drains.
    pub fn quit(&self) {
        self.control.quit();
    }

    /// Stops registration and new dispatch; in-flight work completes.
    pub fn abort(&self) {
        self.control.abort();
    }

    /// A snapshot of the live counters.
    #[must_use]
    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Waits for the engine to finish and returns the final stats.
    ///
    /// Undelivered events are discarded.
    pub async fn join(self) -> SyncStats {
        match self.join.await {
            Ok(stats) => stats,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => SyncStats::default(),
        }
    }
}
