//! Per-item retry accounting.

use crate::key::ObjectKey;
use std::collections::HashMap;

/// What to do with an item that just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryDecision {
    /// Re-queue the item; `attempt` is the retry number starting at 1.
    Retry {
        /// The retry number, 1-based.
        attempt: u32,
    },
    /// Retries exhausted (or the error cannot be retried); the item is
    /// permanently ignored.
    GiveUp,
}

/// Tracks retry counts per key and decides retry vs. give-up.
///
/// An item is attempted at most `1 + max_retries` times. The table entry
/// is cleared on give-up, so a later failure of a re-registered key (a
/// fresh run) starts the count over.
#[derive(Debug)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    counts: HashMap<ObjectKey, u32>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            counts: HashMap::new(),
        }
    }

    /// Records a failure of `key` and returns the decision.
    ///
    /// `retryable` is false for errors that cannot succeed on retry;
    /// those give up immediately regardless of the budget.
    pub fn on_failure(&mut self, key: &ObjectKey, retryable: bool) -> RetryDecision {
        if !retryable || self.max_retries == 0 {
            self.counts.remove(key);
            return RetryDecision::GiveUp;
        }

        match self.counts.get(key).copied() {
            None => {
                self.counts.insert(key.clone(), 1);
                RetryDecision::Retry { attempt: 1 }
            }
            Some(count) if count >= self.max_retries => {
                self.counts.remove(key);
                RetryDecision::GiveUp
            }
            Some(count) => {
                self.counts.insert(key.clone(), count + 1);
                RetryDecision::Retry { attempt: count + 1 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::new(s)
    }

    #[test]
    fn retries_then_gives_up() {
        let mut policy = RetryPolicy::new(3);
        let k = key("a");

        assert_eq!(policy.on_failure(&k, true), RetryDecision::Retry { attempt: 1 });
        assert_eq!(policy.on_failure(&k, true), RetryDecision::Retry { attempt: 2 });
        assert_eq!(policy.on_failure(&k, true), RetryDecision::Retry { attempt: 3 });
        assert_eq!(policy.on_failure(&k, true), RetryDecision::GiveUp);
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut policy = RetryPolicy::new(0);
        assert_eq!(policy.on_failure(&key("a"), true), RetryDecision::GiveUp);
    }

    #[test]
    fn non_retryable_errors_skip_the_budget() {
        let mut policy = RetryPolicy::new(3);
        let k = key("a");
        assert_eq!(policy.on_failure(&k, true), RetryDecision::Retry { attempt: 1 });
        assert_eq!(policy.on_failure(&k, false), RetryDecision::GiveUp);
        // The cleared entry restarts the count.
        assert_eq!(policy.on_failure(&k, true), RetryDecision::Retry { attempt: 1 });
    }

    #[test]
    fn keys_are_tracked_independently() {
        let mut policy = RetryPolicy::new(1);
        assert_eq!(policy.on_failure(&key("a"), true), RetryDecision::Retry { attempt: 1 });
        assert_eq!(policy.on_failure(&key("b"), true), RetryDecision::Retry { attempt: 1 });
        assert_eq!(policy.on_failure(&key("a"), true), RetryDecision::GiveUp);
    }
}
