//! Fixture trees and pre-seeded stores.

use std::path::Path;
use tempfile::TempDir;
use tidesync_store::MemoryStore;

/// A temporary directory tree with automatic cleanup.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Creates an empty tree.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp directory"),
        }
    }

    /// Creates a tree from `(relative_path, contents)` pairs.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tidesync_testkit::fixtures::TestTree;
    ///
    /// let tree = TestTree::with_files(&[("a/1.txt", "one"), ("b.txt", "two")]);
    /// assert!(tree.path().join("a/1.txt").is_file());
    /// ```
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let tree = Self::empty();
        for (path, contents) in files {
            tree.write(path, contents.as_bytes());
        }
        tree
    }

    /// Writes one file, creating parents.
    pub fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent directories");
        }
        std::fs::write(&path, contents).expect("failed to write fixture file");
    }

    /// Creates an empty subdirectory.
    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.dir.path().join(relative))
            .expect("failed to create fixture directory");
    }

    /// The tree's root path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reads a file back, panicking if absent.
    pub fn read(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(relative)).expect("fixture file missing")
    }

    /// True if the relative path exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }
}

/// Builds a [`MemoryStore`] from `(key, body)` pairs.
pub fn seeded_store(objects: &[(&str, &str)]) -> MemoryStore {
    MemoryStore::with_objects(
        objects
            .iter()
            .map(|(key, body)| (key.to_string(), body.as_bytes().to_vec())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_builds_nested_files() {
        let tree = TestTree::with_files(&[("x/y/z.txt", "deep"), ("top.txt", "flat")]);
        assert_eq!(tree.read("x/y/z.txt"), b"deep");
        assert!(tree.exists("top.txt"));
        assert!(!tree.exists("missing"));
    }

    #[test]
    fn seeded_store_holds_objects() {
        let store = seeded_store(&[("a", "1"), ("b", "2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.body("a").unwrap(), b"1");
    }
}
