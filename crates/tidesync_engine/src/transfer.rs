//! The per-item transfer operation.

use crate::error::SyncResult;
use crate::key::ObjectKey;
use crate::ledger::Resolution;
use crate::queue::Locator;
use std::future::Future;

/// Moves one item's data between the store and the local tree.
///
/// Implementations are direction-specific (download for backup, upload
/// for restore). A transfer may resolve an item without moving bytes:
/// backup ignores directory-marker keys, restore skips filtered items.
/// Errors are absorbed by the scheduler's retry bookkeeping and never
/// propagate further.
pub(crate) trait Transfer: Send + Sync + 'static {
    /// Performs the transfer for `key`.
    fn run(
        &self,
        key: &ObjectKey,
        locator: &Locator,
    ) -> impl Future<Output = SyncResult<Resolution>> + Send;
}

/// Completion report delivered back to the coordinator.
#[derive(Debug)]
pub(crate) struct TaskOutcome {
    pub key: ObjectKey,
    pub locator: Locator,
    pub result: SyncResult<Resolution>,
}

/// Joins a '/'-delimited relative name under `root`, refusing anything
/// that could step outside it.
pub(crate) fn resolve_under(root: &std::path::Path, relative: &str) -> Option<std::path::PathBuf> {
    let mut path = root.to_path_buf();
    let mut pushed = false;
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        path.push(segment);
        pushed = true;
    }
    pushed.then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn resolve_under_joins_segments() {
        let path = resolve_under(Path::new("/root"), "a/b/c.txt").unwrap();
        assert_eq!(path, Path::new("/root/a/b/c.txt"));
    }

    #[test]
    fn resolve_under_rejects_escapes() {
        for bad in ["", "..", "a/../b", "/abs", "a//b", "./a"] {
            assert!(
                resolve_under(Path::new("/root"), bad).is_none(),
                "{bad:?} was accepted"
            );
        }
    }
}
