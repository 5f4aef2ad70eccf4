//! Quit/abort signalling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared stop flags, owned jointly by the coordinator, the enumerator,
/// and every [`SyncControl`] clone.
#[derive(Debug, Default)]
pub(crate) struct SignalState {
    stop_register: AtomicBool,
    stop_dispatch: AtomicBool,
    changed: Notify,
}

impl SignalState {
    /// Stops registration; queued and in-flight items drain normally.
    pub fn quit(&self) {
        self.stop_register.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    /// Stops registration and new dispatch. In-flight transfers run to
    /// completion and their results are still archived.
    pub fn abort(&self) {
        self.stop_register.store(true, Ordering::SeqCst);
        self.stop_dispatch.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    pub fn register_stopped(&self) -> bool {
        self.stop_register.load(Ordering::SeqCst)
    }

    pub fn dispatch_stopped(&self) -> bool {
        self.stop_dispatch.load(Ordering::SeqCst)
    }

    /// Resolves on the next quit/abort. Used by producers blocked on a
    /// full discovery channel so a stop signal wakes them promptly.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

/// Caller-facing control handle for a running sync.
///
/// Cloneable; all clones control the same run.
///
/// # Example
///
/// ```no_run
/// # async fn demo(handle: tidesync_engine::SyncHandle) {
/// let control = handle.control();
/// control.quit(); // graceful drain
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SyncControl {
    inner: Arc<SignalState>,
}

impl SyncControl {
    pub(crate) fn new(inner: Arc<SignalState>) -> Self {
        Self { inner }
    }

    /// Stops discovering and registering new items; everything already
    /// queued or in flight finishes normally.
    pub fn quit(&self) {
        self.inner.quit();
    }

    /// Stops registration and new dispatch immediately. In-flight
    /// transfers complete and are archived, then the run ends with
    /// partial stats.
    pub fn abort(&self) {
        self.inner.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_stops_registration_only() {
        let state = SignalState::default();
        state.quit();
        assert!(state.register_stopped());
        assert!(!state.dispatch_stopped());
    }

    #[test]
    fn abort_stops_both() {
        let state = SignalState::default();
        state.abort();
        assert!(state.register_stopped());
        assert!(state.dispatch_stopped());
    }

    #[tokio::test]
    async fn changed_wakes_waiters() {
        let state = Arc::new(SignalState::default());
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.changed().await })
        };
        tokio::task::yield_now().await;
        state.abort();
        waiter.await.unwrap();
    }
}
