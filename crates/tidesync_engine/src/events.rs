//! Typed progress events emitted by the engine.

use crate::key::ObjectKey;
use tokio::sync::mpsc;

/// Aggregate counters attached to warning, failure, and end events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Items transferred to the destination.
    pub created: u64,
    /// Items permanently failed.
    pub ignored: u64,
    /// Items a filter excluded (restore only).
    pub skipped: u64,
    /// Total failures, item-level and listing-level.
    pub errors: u64,
}

/// Live counters observable through [`SyncHandle::progress`](crate::SyncHandle::progress).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Items registered so far (retries do not re-count).
    pub registered: u64,
    /// Transfer tasks currently running.
    pub in_flight: u64,
    /// Items queued and not yet dispatched.
    pub waiting: u64,
    /// Terminal counters, as in [`SyncStats`].
    pub stats: SyncStats,
}

/// One progress notification.
///
/// Events arrive in the order the coordinator observed the transitions;
/// [`SyncEvent::MoveOn`] keys are non-decreasing and each one's entire
/// registration-order prefix has resolved. `MoveOn` is the only value a
/// caller needs to persist for crash resumption.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// An item was transferred.
    Created {
        /// The item's key.
        key: ObjectKey,
    },
    /// An item permanently failed and was given up on.
    Ignored {
        /// The item's key.
        key: ObjectKey,
    },
    /// A filter excluded an item without error (restore only).
    Skipped {
        /// The item's key.
        key: ObjectKey,
    },
    /// An item failed and will be retried.
    Warning {
        /// Description of the failure.
        error: String,
        /// Counters at emission time.
        stats: SyncStats,
    },
    /// An item failed for the last time; it was counted as ignored.
    Failed {
        /// Description of the failure.
        error: String,
        /// Counters at emission time.
        stats: SyncStats,
    },
    /// A local filename is not valid UTF-8 and cannot become a key
    /// (restore only). The item is reported, not registered.
    NonUtf8Name {
        /// Key of the containing directory.
        parent: String,
        /// The raw filename bytes.
        raw: Vec<u8>,
    },
    /// The resume cursor advanced: everything up to and including `key`
    /// has resolved.
    MoveOn {
        /// The new cursor.
        key: ObjectKey,
    },
    /// The run finished; no further events follow.
    End {
        /// Final counters.
        stats: SyncStats,
    },
}

/// Sender half used inside the engine.
///
/// Emission is non-blocking and infallible: a caller that dropped its
/// receiver simply stops observing.
#[derive(Debug, Clone)]
pub(crate) struct EventSender(mpsc::UnboundedSender<SyncEvent>);

impl EventSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn emit(&self, event: SyncEvent) {
        let _ = self.0.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_delivers_in_order() {
        let (tx, mut rx) = EventSender::channel();
        tx.emit(SyncEvent::Created { key: "a".into() });
        tx.emit(SyncEvent::MoveOn { key: "a".into() });

        assert!(matches!(rx.try_recv().unwrap(), SyncEvent::Created { .. }));
        assert!(matches!(rx.try_recv().unwrap(), SyncEvent::MoveOn { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let (tx, rx) = EventSender::channel();
        drop(rx);
        tx.emit(SyncEvent::End {
            stats: SyncStats::default(),
        });
    }
}
