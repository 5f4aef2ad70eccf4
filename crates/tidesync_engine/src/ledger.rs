//! The status ledger and its archiving sweep.
//!
//! Transfers complete out of order under concurrency, but the resume
//! cursor must never move past an item that has not resolved - a crash
//! would silently skip it on restart. The ledger keeps every registered
//! item in registration order and only advances the cursor over a
//! contiguous resolved prefix.

use crate::key::ObjectKey;
use std::collections::VecDeque;

/// Terminal outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The item was transferred to the destination.
    Created,
    /// The item failed permanently (retries exhausted or a
    /// non-retryable error).
    Ignored,
    /// A filter decided the item needs no transfer.
    Skipped,
}

/// Lifecycle state of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemStatus {
    /// Registered, not yet dispatched.
    Waiting,
    /// A transfer task is running.
    InProgress,
    /// Terminal. Every resolution counts equally for the archiving
    /// sweep; only the counters distinguish them.
    Resolved(Resolution),
}

#[derive(Debug)]
struct LedgerEntry {
    key: ObjectKey,
    status: ItemStatus,
}

/// Registration-ordered record of unarchived items.
///
/// Entries leave the ledger only through [`StatusLedger::resolve`]'s
/// prefix sweep, never individually. For a traversal-driven enumerator
/// registration order equals key order, which is what makes the swept
/// prefix's last key a valid resume point.
#[derive(Debug, Default)]
pub(crate) struct StatusLedger {
    entries: VecDeque<LedgerEntry>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a newly registered item in Waiting state.
    pub fn register(&mut self, key: ObjectKey) {
        debug_assert!(
            self.position(&key).is_none(),
            "duplicate key registered: {key}"
        );
        self.entries.push_back(LedgerEntry {
            key,
            status: ItemStatus::Waiting,
        });
    }

    /// Marks an item as dispatched.
    pub fn mark_in_progress(&mut self, key: &ObjectKey) {
        if let Some(i) = self.position(key) {
            self.entries[i].status = ItemStatus::InProgress;
        }
    }

    /// Puts a failed item back into Waiting state for a retry.
    pub fn reset_waiting(&mut self, key: &ObjectKey) {
        if let Some(i) = self.position(key) {
            self.entries[i].status = ItemStatus::Waiting;
        }
    }

    /// Records a terminal resolution and, when the item heads the
    /// ledger, sweeps the maximal contiguous resolved prefix.
    ///
    /// Returns the key of the last swept entry - the new resume cursor -
    /// or `None` when the cursor cannot move yet.
    ///
    /// Each entry is scanned at most twice across a run (once as a
    /// non-head resolution, once when the sweep reaches it), so the
    /// sweep is amortized O(1) per item.
    pub fn resolve(&mut self, key: &ObjectKey, resolution: Resolution) -> Option<ObjectKey> {
        let i = self.position(key)?;
        self.entries[i].status = ItemStatus::Resolved(resolution);

        if i > 0 {
            return None;
        }

        let mut last = 0;
        while last + 1 < self.entries.len()
            && matches!(self.entries[last + 1].status, ItemStatus::Resolved(_))
        {
            last += 1;
        }
        let cursor = self.entries[last].key.clone();
        self.entries.drain(..=last);
        Some(cursor)
    }

    /// Number of unarchived entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when every registered item has been archived.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &ObjectKey) -> Option<usize> {
        self.entries.iter().position(|e| &e.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::new(s)
    }

    fn ledger_with(keys: &[&str]) -> StatusLedger {
        let mut ledger = StatusLedger::new();
        for k in keys {
            ledger.register(key(k));
        }
        ledger
    }

    #[test]
    fn head_resolution_sweeps_immediately() {
        let mut ledger = ledger_with(&["a", "b"]);
        let cursor = ledger.resolve(&key("a"), Resolution::Created);
        assert_eq!(cursor, Some(key("a")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn non_head_resolution_does_not_move_cursor() {
        let mut ledger = ledger_with(&["a", "b", "c"]);
        assert_eq!(ledger.resolve(&key("b"), Resolution::Created), None);
        assert_eq!(ledger.resolve(&key("c"), Resolution::Created), None);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn head_resolution_sweeps_resolved_successors() {
        let mut ledger = ledger_with(&["a", "b", "c", "d"]);
        ledger.resolve(&key("b"), Resolution::Created);
        ledger.resolve(&key("c"), Resolution::Ignored);

        // `a` resolving last sweeps a, b, c in one step; `d` stays.
        let cursor = ledger.resolve(&key("a"), Resolution::Created);
        assert_eq!(cursor, Some(key("c")));
        assert_eq!(ledger.len(), 1);

        let cursor = ledger.resolve(&key("d"), Resolution::Created);
        assert_eq!(cursor, Some(key("d")));
        assert!(ledger.is_empty());
    }

    #[test]
    fn every_terminal_state_gates_the_sweep() {
        for resolution in [Resolution::Created, Resolution::Ignored, Resolution::Skipped] {
            let mut ledger = ledger_with(&["a", "b"]);
            ledger.resolve(&key("b"), resolution);
            let cursor = ledger.resolve(&key("a"), Resolution::Created);
            assert_eq!(cursor, Some(key("b")), "{resolution:?} blocked the sweep");
        }
    }

    #[test]
    fn in_progress_blocks_the_sweep() {
        let mut ledger = ledger_with(&["a", "b", "c"]);
        ledger.mark_in_progress(&key("b"));
        ledger.resolve(&key("c"), Resolution::Created);

        let cursor = ledger.resolve(&key("a"), Resolution::Created);
        assert_eq!(cursor, Some(key("a")), "swept past an in-progress item");
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn retry_reset_keeps_position() {
        let mut ledger = ledger_with(&["a", "b"]);
        ledger.mark_in_progress(&key("a"));
        ledger.reset_waiting(&key("a"));

        // `b` resolving must not advance past the still-unresolved `a`.
        assert_eq!(ledger.resolve(&key("b"), Resolution::Created), None);
        assert_eq!(ledger.resolve(&key("a"), Resolution::Created), Some(key("b")));
        assert!(ledger.is_empty());
    }

    #[test]
    fn cursor_keys_are_non_decreasing_for_any_completion_order() {
        use proptest::prelude::*;

        proptest!(|(order in Just((0usize..12).collect::<Vec<_>>()).prop_shuffle())| {
            let keys: Vec<ObjectKey> =
                (0..12).map(|i| ObjectKey::new(format!("k/{i:02}"))).collect();
            let mut ledger = StatusLedger::new();
            for k in &keys {
                ledger.register(k.clone());
            }

            let mut resolved = vec![false; keys.len()];
            let mut cursors = Vec::new();
            for &i in &order {
                resolved[i] = true;
                if let Some(cursor) = ledger.resolve(&keys[i], Resolution::Created) {
                    // Everything at or before the cursor has resolved.
                    let pos = keys.iter().position(|k| k == &cursor).unwrap();
                    prop_assert!(resolved[..=pos].iter().all(|&r| r));
                    cursors.push(cursor);
                }
            }

            // All twelve resolutions drain the ledger, and the emitted
            // cursors are strictly increasing in key order.
            prop_assert!(ledger.is_empty());
            prop_assert!(cursors.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(cursors.last(), Some(&keys[11]));
        });
    }
}
