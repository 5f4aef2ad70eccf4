//! A scriptable store wrapper for forcing failures and completion
//! orders.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tidesync_store::{
    ObjectMeta, ObjectPage, ObjectStore, StoreError, StoreResult, StoredObject,
};
use tokio::sync::Semaphore;

struct Gate {
    sem: Arc<Semaphore>,
    /// First get/put call number (1-based, per key) the gate applies to.
    from_call: u32,
}

#[derive(Default)]
struct ScriptState {
    /// Remaining failures to inject per key (get and put).
    fail_budgets: HashMap<String, u32>,
    /// Remaining listing failures to inject.
    listing_failures: u32,
    /// Keys whose transfers are held until released.
    gates: HashMap<String, Gate>,
    /// Per-key get/put call counts.
    calls: HashMap<String, u32>,
    /// Operations seen, e.g. `"get a/1"`.
    log: Vec<String>,
    /// Currently executing get/put calls.
    active: u32,
    /// High-water mark of `active`.
    high_water: u32,
}

/// Wraps an [`ObjectStore`] with per-key failure budgets and completion
/// gates.
///
/// Failure budgets make the next N `get`/`put` calls for a key fail
/// with a retryable error - the tool for exercising retry paths.
/// Gates hold a key's transfer in flight until the test releases it -
/// the tool for forcing a specific completion order under concurrency.
/// [`ScriptedStore::hold_from`] gates only from the nth call on, which
/// lets a test fail an item's first attempt fast while pinning its
/// retry.
///
/// # Example
///
/// ```rust
/// use tidesync_testkit::prelude::*;
///
/// let store = ScriptedStore::new(seeded_store(&[("a", "1")]));
/// store.fail_times("a", 2); // first two attempts fail, third succeeds
/// ```
pub struct ScriptedStore<S> {
    inner: S,
    state: Mutex<ScriptState>,
}

impl<S> ScriptedStore<S> {
    /// Wraps a store with an empty script.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Makes the next `times` get/put calls for `key` fail retryably.
    pub fn fail_times(&self, key: &str, times: u32) {
        self.state.lock().fail_budgets.insert(key.into(), times);
    }

    /// Makes the next `times` list calls fail retryably.
    pub fn fail_listings(&self, times: u32) {
        self.state.lock().listing_failures = times;
    }

    /// Holds every get/put for `key` until [`ScriptedStore::release`].
    pub fn hold(&self, key: &str) {
        self.hold_from(key, 1);
    }

    /// Holds get/put calls for `key` starting with the `from_call`th
    /// (1-based) until released. Earlier calls pass through.
    pub fn hold_from(&self, key: &str, from_call: u32) {
        self.state.lock().gates.insert(
            key.into(),
            Gate {
                sem: Arc::new(Semaphore::new(0)),
                from_call,
            },
        );
    }

    /// Releases a held key; its in-flight and future calls proceed.
    pub fn release(&self, key: &str) {
        if let Some(gate) = self.state.lock().gates.remove(key) {
            gate.sem.add_permits(Semaphore::MAX_PERMITS);
        }
    }

    /// The operations observed so far.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Count of logged operations with the given verb (`"get"`, `"put"`,
    /// `"head"`, `"list"`).
    pub fn count_ops(&self, verb: &str) -> usize {
        let prefix = format!("{verb} ");
        self.state
            .lock()
            .log
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }

    /// The most get/put calls that were ever executing at once.
    pub fn concurrency_high_water(&self) -> u32 {
        self.state.lock().high_water
    }

    /// Records a transfer call, returning its per-key call number.
    fn enter(&self, verb: &str, key: &str) -> u32 {
        let mut state = self.state.lock();
        state.log.push(format!("{verb} {key}"));
        state.active += 1;
        state.high_water = state.high_water.max(state.active);
        let call = state.calls.entry(key.into()).or_insert(0);
        *call += 1;
        *call
    }

    fn exit(&self) {
        self.state.lock().active -= 1;
    }

    /// Waits on the key's gate, if one applies to this call.
    async fn pass_gate(&self, key: &str, call: u32) {
        let sem = {
            let state = self.state.lock();
            state
                .gates
                .get(key)
                .filter(|gate| call >= gate.from_call)
                .map(|gate| Arc::clone(&gate.sem))
        };
        if let Some(sem) = sem {
            // Released gates hand out permits forever; taking and
            // dropping one lets every later waiter through too.
            let _ = sem.acquire().await;
        }
    }

    /// Consumes one failure budget charge, if any remains.
    fn take_failure(&self, key: &str) -> Option<StoreError> {
        let mut state = self.state.lock();
        match state.fail_budgets.get_mut(key) {
            Some(0) | None => None,
            Some(remaining) => {
                *remaining -= 1;
                Some(StoreError::unavailable(format!("scripted failure for {key}")))
            }
        }
    }
}

impl<S: ObjectStore> ObjectStore for ScriptedStore<S> {
    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> impl Future<Output = StoreResult<ObjectPage>> + Send {
        let fail = {
            let mut state = self.state.lock();
            state
                .log
                .push(format!("list {}", start_after.unwrap_or("-")));
            if state.listing_failures > 0 {
                state.listing_failures -= 1;
                true
            } else {
                false
            }
        };
        async move {
            if fail {
                return Err(StoreError::unavailable("scripted listing failure"));
            }
            self.inner.list(prefix, start_after, max_keys).await
        }
    }

    fn get(&self, key: &str) -> impl Future<Output = StoreResult<StoredObject>> + Send {
        let call = self.enter("get", key);
        async move {
            self.pass_gate(key, call).await;
            let result = match self.take_failure(key) {
                Some(error) => Err(error),
                None => self.inner.get(key).await,
            };
            self.exit();
            result
        }
    }

    fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let call = self.enter("put", key);
        async move {
            self.pass_gate(key, call).await;
            let result = match self.take_failure(key) {
                Some(error) => Err(error),
                None => self.inner.put(key, body, content_type).await,
            };
            self.exit();
            result
        }
    }

    fn head(&self, key: &str) -> impl Future<Output = StoreResult<Option<ObjectMeta>>> + Send {
        self.state.lock().log.push(format!("head {key}"));
        self.inner.head(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seeded_store;

    #[tokio::test]
    async fn failure_budget_is_consumed() {
        let store = ScriptedStore::new(seeded_store(&[("a", "1")]));
        store.fail_times("a", 2);

        assert!(store.get("a").await.is_err());
        assert!(store.get("a").await.is_err());
        assert!(store.get("a").await.is_ok());
        assert_eq!(store.count_ops("get"), 3);
    }

    #[tokio::test]
    async fn gates_hold_and_release() {
        let store = Arc::new(ScriptedStore::new(seeded_store(&[("a", "1")])));
        store.hold("a");

        let fetch = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get("a").await })
        };
        tokio::task::yield_now().await;
        assert!(!fetch.is_finished());

        store.release("a");
        assert!(fetch.await.unwrap().is_ok());

        // A released gate no longer blocks.
        assert!(store.get("a").await.is_ok());
    }

    #[tokio::test]
    async fn hold_from_passes_earlier_calls() {
        let store = ScriptedStore::new(seeded_store(&[("a", "1")]));
        store.hold_from("a", 2);

        // Call 1 passes, call 2 would block.
        assert!(store.get("a").await.is_ok());
        store.release("a");
        assert!(store.get("a").await.is_ok());
    }

    #[tokio::test]
    async fn listing_failures_inject() {
        let store = ScriptedStore::new(seeded_store(&[("a", "1")]));
        store.fail_listings(1);
        assert!(store.list(None, None, 10).await.is_err());
        assert!(store.list(None, None, 10).await.is_ok());
    }

    #[tokio::test]
    async fn unscripted_calls_pass_through() {
        let store = ScriptedStore::new(seeded_store(&[("k", "v")]));
        assert_eq!(store.get("k").await.unwrap().body, b"v");
        assert!(store.head("k").await.unwrap().is_some());
        assert_eq!(store.log(), ["get k", "head k"]);
    }

    #[tokio::test]
    async fn high_water_tracks_overlap() {
        let store = Arc::new(ScriptedStore::new(seeded_store(&[("a", "1"), ("b", "2")])));
        store.hold("a");
        store.hold("b");

        let tasks: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|key| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get(key).await })
            })
            .collect();
        tokio::task::yield_now().await;

        store.release("a");
        store.release("b");
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(store.concurrency_high_water(), 2);
    }
}
