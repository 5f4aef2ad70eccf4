//! Per-task state: resume marker and append-only logs.
//!
//! Every (action, store, directory, prefix) combination gets a stable
//! task id; its state lives under `<state-dir>/<task-id>/` as a
//! `task.json` (the persisted resume marker) plus one append-only log
//! per event kind. A later run with the same parameters finds the
//! marker and resumes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The substantive parameters that identify a task.
///
/// Only inputs that affect the task's *result* participate; tuning
/// options like concurrency do not, so re-running with different
/// tuning still resumes the same task.
#[derive(Debug)]
pub struct TaskIdentity<'a> {
    /// `"backup"` or `"restore"`.
    pub action: &'a str,
    /// The store root.
    pub store: &'a Path,
    /// The local mirror directory.
    pub directory: &'a Path,
    /// The key prefix, if any.
    pub prefix: Option<&'a str>,
}

impl TaskIdentity<'_> {
    /// Derives the hex task id.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.action.as_bytes());
        hasher.update([0]);
        hasher.update(self.store.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(self.directory.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(self.prefix.unwrap_or("").as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TaskFile {
    marker: Option<String>,
}

/// A task's on-disk state directory.
#[derive(Debug)]
pub struct TaskState {
    root: PathBuf,
}

impl TaskState {
    /// Opens (creating if needed) the state directory for a task.
    pub fn open(state_dir: &Path, identity: &TaskIdentity<'_>) -> io::Result<Self> {
        let root = state_dir.join(identity.id());
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The task's state directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn task_file(&self) -> PathBuf {
        self.root.join("task.json")
    }

    /// Reads the persisted resume marker, if any.
    pub fn load_marker(&self) -> io::Result<Option<String>> {
        match std::fs::read(self.task_file()) {
            Ok(bytes) => {
                let task: TaskFile = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(task.marker)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persists the resume marker.
    pub fn save_marker(&self, marker: &str) -> io::Result<()> {
        let task = TaskFile {
            marker: Some(marker.to_string()),
        };
        let json = serde_json::to_vec_pretty(&task)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(self.task_file(), json)
    }

    /// Collects the keys a previous run ignored, for a fill run.
    ///
    /// Reads `ignore.log` plus any `ignore.bak` left by an interrupted
    /// fill, merges and sorts them, snapshots the merged list to
    /// `ignore.bak`, and removes `ignore.log`. An interrupted fill run
    /// therefore re-attempts the full list next time.
    pub fn take_fill_keys(&self) -> io::Result<Vec<String>> {
        let mut keys = BTreeSet::new();
        for name in ["ignore.log", "ignore.bak"] {
            match std::fs::read_to_string(self.root.join(name)) {
                Ok(contents) => {
                    keys.extend(
                        contents
                            .lines()
                            .filter(|line| !line.is_empty())
                            .map(String::from),
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        let keys: Vec<String> = keys.into_iter().collect();

        std::fs::write(self.root.join("ignore.bak"), keys.join("\n"))?;
        match std::fs::remove_file(self.root.join("ignore.log")) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(keys)
    }

    /// Removes the fill snapshot after a fill run completed.
    pub fn clear_fill_backup(&self) -> io::Result<()> {
        match std::fs::remove_file(self.root.join("ignore.bak")) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Opens the append-only event logs.
    pub fn open_logs(&self) -> io::Result<TaskLogs> {
        let open = |name: &str| -> io::Result<File> {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.root.join(name))
        };
        Ok(TaskLogs {
            success: open("success.log")?,
            ignore: open("ignore.log")?,
            skipped: open("skipped.log")?,
            error: open("error.log")?,
            non_utf8: open("no-utf8-filename.log")?,
        })
    }
}

/// Append-only per-event logs.
#[derive(Debug)]
pub struct TaskLogs {
    success: File,
    ignore: File,
    skipped: File,
    error: File,
    non_utf8: File,
}

impl TaskLogs {
    /// Logs a created key.
    pub fn created(&mut self, key: &str) -> io::Result<()> {
        writeln!(self.success, "{key}")
    }

    /// Logs a permanently ignored key.
    pub fn ignored(&mut self, key: &str) -> io::Result<()> {
        writeln!(self.ignore, "{key}")
    }

    /// Logs a filtered key.
    pub fn skipped(&mut self, key: &str) -> io::Result<()> {
        writeln!(self.skipped, "{key}")
    }

    /// Logs an error line.
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.error, "{message}")
    }

    /// Logs a non-representable filename as `parent:hex`.
    pub fn non_utf8(&mut self, parent: &str, raw: &[u8]) -> io::Result<()> {
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        writeln!(self.non_utf8, "{parent}:{hex}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity<'a>(store: &'a Path, directory: &'a Path) -> TaskIdentity<'a> {
        TaskIdentity {
            action: "backup",
            store,
            directory,
            prefix: None,
        }
    }

    #[test]
    fn task_id_is_stable_and_parameter_sensitive() {
        let a = Path::new("/store");
        let b = Path::new("/dir");
        let id1 = identity(a, b).id();
        let id2 = identity(a, b).id();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 64);

        let other = TaskIdentity {
            action: "restore",
            store: a,
            directory: b,
            prefix: None,
        };
        assert_ne!(id1, other.id());

        let prefixed = TaskIdentity {
            prefix: Some("photos/"),
            ..identity(a, b)
        };
        assert_ne!(id1, prefixed.id());
    }

    #[test]
    fn marker_round_trip() {
        let dir = TempDir::new().unwrap();
        let task = TaskState::open(dir.path(), &identity(Path::new("/s"), Path::new("/d"))).unwrap();

        assert_eq!(task.load_marker().unwrap(), None);
        task.save_marker("a/b/c").unwrap();
        assert_eq!(task.load_marker().unwrap().as_deref(), Some("a/b/c"));
        task.save_marker("x").unwrap();
        assert_eq!(task.load_marker().unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn fill_keys_merge_sort_and_dedupe() {
        let dir = TempDir::new().unwrap();
        let task = TaskState::open(dir.path(), &identity(Path::new("/s"), Path::new("/d"))).unwrap();

        std::fs::write(task.root().join("ignore.log"), "b\na\n\nb\n").unwrap();
        std::fs::write(task.root().join("ignore.bak"), "c\n").unwrap();

        let keys = task.take_fill_keys().unwrap();
        assert_eq!(keys, ["a", "b", "c"]);

        // The log is consumed, the snapshot holds the merged list.
        assert!(!task.root().join("ignore.log").exists());
        let bak = std::fs::read_to_string(task.root().join("ignore.bak")).unwrap();
        assert_eq!(bak, "a\nb\nc");

        task.clear_fill_backup().unwrap();
        assert!(!task.root().join("ignore.bak").exists());
    }

    #[test]
    fn logs_append_lines() {
        let dir = TempDir::new().unwrap();
        let task = TaskState::open(dir.path(), &identity(Path::new("/s"), Path::new("/d"))).unwrap();

        let mut logs = task.open_logs().unwrap();
        logs.created("k1").unwrap();
        logs.created("k2").unwrap();
        logs.non_utf8("dir", &[0xff]).unwrap();

        let success = std::fs::read_to_string(task.root().join("success.log")).unwrap();
        assert_eq!(success, "k1\nk2\n");
        let bad = std::fs::read_to_string(task.root().join("no-utf8-filename.log")).unwrap();
        assert_eq!(bad, "dir:ff\n");
    }
}
