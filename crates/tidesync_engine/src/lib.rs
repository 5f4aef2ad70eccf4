//! # tidesync Engine
//!
//! Bidirectional mirror engine between an object store and a local
//! directory tree.
//!
//! This crate provides:
//! - [`backup`] - remote store to local tree
//! - [`restore`] - local tree to remote store
//! - Bounded-concurrency dispatch with per-item retry
//! - A crash-safe resume cursor ([`SyncEvent::MoveOn`])
//! - Typed progress events and quit/abort control
//!
//! ## Architecture
//!
//! Both directions share one engine: an enumerator produces a sorted
//! key sequence, a bounded worker pool performs one transfer per item,
//! and a status ledger archives completions. Items may finish out of
//! order; the ledger only advances the resume cursor over a contiguous
//! resolved prefix, so a persisted cursor never points past unfinished
//! work.
//!
//! All bookkeeping lives in a single coordinator task. Concurrency is
//! expressed as spawned transfer tasks reporting back over a channel,
//! so the ledger, queues, and counters need no locks.
//!
//! ## Key Invariants
//!
//! - `MoveOn` keys are non-decreasing, and every key at or before an
//!   emitted cursor has a terminal status
//! - An item is attempted at most `1 + max_retries` times and produces
//!   exactly one terminal event
//! - Registration order equals traversal order; completion order is
//!   unconstrained
//! - A run always ends with exactly one `End` event, even after abort
//!
//! ## Delivery semantics
//!
//! At-least-once with idempotent overwrite at the destination; a resumed
//! run may re-transfer items that completed after the persisted cursor.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod config;
mod coordinator;
mod enumerate;
mod error;
mod events;
mod handle;
mod key;
mod ledger;
mod lister;
mod queue;
mod restore;
mod retry;
mod signal;
mod transfer;
mod walker;

pub use backup::backup;
pub use config::{BackupOptions, DualMetaFilter, KeyFilter, KeyMapper, RestoreOptions};
pub use error::{SyncError, SyncResult};
pub use events::{Progress, SyncEvent, SyncStats};
pub use handle::SyncHandle;
pub use key::{Marker, ObjectKey};
pub use restore::restore;
pub use signal::SyncControl;
