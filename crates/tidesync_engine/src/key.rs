//! Object keys and the resume marker.
//!
//! Keys order by '/'-delimited segments, not by raw bytes. The
//! distinction matters: a sorted directory walk visits `a/b` before
//! `a.c` (children of `a` come while `a` is open), while plain string
//! comparison puts `a.c` first because `.` sorts below `/`. Resume
//! decisions compare keys in walk order, so [`ObjectKey`]'s `Ord` is
//! segment-wise.

use std::cmp::Ordering;
use std::fmt;

/// A sortable, '/'-delimited item identifier.
///
/// Keys mirror path-like remote object names (`photos/2024/a.jpg`).
/// Within one sync run every registered key is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Creates a key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for directory-marker keys (trailing '/').
    #[must_use]
    pub fn is_dir_marker(&self) -> bool {
        self.0.ends_with('/')
    }

    /// The key's '/'-delimited segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// True if `self` names a directory strictly above `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &ObjectKey) -> bool {
        let mut theirs = other.segments();
        for segment in self.segments() {
            if theirs.next() != Some(segment) {
                return false;
            }
        }
        theirs.next().is_some()
    }
}

impl Ord for ObjectKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(other.segments())
    }
}

impl PartialOrd for ObjectKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The resume cursor of a previous run.
///
/// A marker divides a sorted traversal into "already synchronized"
/// (every key up to and including the marker) and "still to do". The
/// local walker consults it to skip whole subtrees; see
/// [`Marker::covers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marker(Option<ObjectKey>);

impl Marker {
    /// Creates a marker, `None` meaning "start from the beginning".
    pub fn new(key: Option<impl Into<ObjectKey>>) -> Self {
        Self(key.map(Into::into))
    }

    /// True if a resume point is set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// The marker key, if set.
    #[must_use]
    pub fn key(&self) -> Option<&ObjectKey> {
        self.0.as_ref()
    }

    /// True if `key` is exactly the resume point.
    #[must_use]
    pub fn matches(&self, key: &ObjectKey) -> bool {
        self.0.as_ref() == Some(key)
    }

    /// True if the subtree rooted at `key` was fully visited by the run
    /// that stopped at this marker.
    ///
    /// A key strictly before the marker in walk order is covered unless
    /// it is an ancestor of the marker: the run stopped somewhere inside
    /// an ancestor, so that directory was only partially visited and
    /// must be descended again.
    #[must_use]
    pub fn covers(&self, key: &ObjectKey) -> bool {
        match &self.0 {
            None => false,
            Some(marker) => !key.is_ancestor_of(marker) && key < marker,
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
    fn ordering_is_segment_wise() {
        assert!(key("a/b") < key("a.c"));
        assert!(key("a/1") < key("a/2"));
        assert!(key("a") < key("a/b"));
        assert!(key("a/b") < key("b"));
        assert!(key("x/10") < key("x/2"));
    }

    #[test]
    fn dir_marker_detection() {
        assert!(key("photos/").is_dir_marker());
        assert!(!key("photos/a.jpg").is_dir_marker());
    }

    #[test]
    fn ancestor_relation() {
        assert!(key("a").is_ancestor_of(&key("a/b")));
        assert!(key("a/b").is_ancestor_of(&key("a/b/c")));
        assert!(!key("a").is_ancestor_of(&key("a")));
        assert!(!key("a").is_ancestor_of(&key("ab/c")));
        assert!(!key("a/b").is_ancestor_of(&key("a")));
    }

    #[test]
    fn unset_marker_covers_nothing() {
        let marker = Marker::default();
        assert!(!marker.is_set());
        assert!(!marker.covers(&key("a")));
        assert!(!marker.matches(&key("a")));
    }

    #[test]
    fn marker_covers_earlier_subtrees_only() {
        let marker = Marker::new(Some("x/2"));

        // Fully visited before the marker.
        assert!(marker.covers(&key("x/1")));
        assert!(marker.covers(&key("w")));

        // The marker's own directory was only partially visited.
        assert!(!marker.covers(&key("x")));

        // At or beyond the marker.
        assert!(!marker.covers(&key("x/2")));
        assert!(marker.matches(&key("x/2")));
        assert!(!marker.covers(&key("x/3")));
        assert!(!marker.covers(&key("y")));
    }

    #[test]
    fn marker_covers_in_walk_order() {
        // `a/b` sorts before `a.c` in walk order; a marker at `a.c`
        // therefore covers everything under `a`.
        let marker = Marker::new(Some("a.c"));
        assert!(marker.covers(&key("a")));
        assert!(marker.covers(&key("a/b")));
    }
}
