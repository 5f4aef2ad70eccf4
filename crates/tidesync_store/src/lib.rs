//! # tidesync Store
//!
//! Object store abstraction for tidesync.
//!
//! This crate defines the narrow interface the sync engine calls to reach
//! a remote object collection: paged listing, get, put, and metadata-only
//! head. Stores are **bucket-scoped byte stores** - they speak
//! '/'-delimited keys and know nothing about sync state, cursors, or
//! retry policy.
//!
//! ## Design Principles
//!
//! - Keys are opaque sortable strings; listings are returned in key order
//! - Writes are idempotent overwrites (no compare-and-swap)
//! - A missing object is a `None` from `head`, an error from `get`
//! - Stores must be `Send + Sync` so transfers can run concurrently
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - for testing and ephemeral mirrors
//! - [`DirStore`] - a local directory tree posing as a bucket
//!
//! ## Example
//!
//! ```rust
//! use tidesync_store::{MemoryStore, ObjectStore};
//!
//! # async fn demo() {
//! let store = MemoryStore::new();
//! store.put("docs/a.md", b"hello".to_vec(), None).await.unwrap();
//! let page = store.list(Some("docs/"), None, 100).await.unwrap();
//! assert_eq!(page.objects.len(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod error;
mod memory;
mod object;
mod store;

pub use dir::DirStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use object::{ObjectMeta, ObjectPage, StoredObject};
pub use store::ObjectStore;
