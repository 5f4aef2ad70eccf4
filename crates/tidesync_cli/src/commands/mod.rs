//! CLI command implementations.

pub mod backup;
pub mod restore;

use crate::task::TaskState;
use std::error::Error;
use tidesync_engine::{SyncEvent, SyncHandle, SyncStats};

/// Tuning and workflow flags shared by both directions.
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Concurrent transfer override.
    pub concurrency: Option<usize>,
    /// Per-item retry budget.
    pub retry: u32,
    /// Abort threshold on accumulated failures.
    pub max_errors: Option<u64>,
    /// Registration cap.
    pub max_items: Option<u64>,
    /// Ignore the persisted resume marker.
    pub start_over: bool,
    /// Re-attempt the keys a previous run ignored.
    pub fill: bool,
}

/// Drives a run to its end: prints console lines, appends the event
/// logs, and persists every cursor advance (unless in fill mode, where
/// the marker belongs to the primary run).
///
/// Ctrl-C requests a graceful quit; in-flight transfers drain and the
/// summary still prints.
pub(crate) async fn drive(
    mut handle: SyncHandle,
    task: &TaskState,
    persist_marker: bool,
) -> Result<SyncStats, Box<dyn Error>> {
    let mut logs = task.open_logs()?;

    let control = handle.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, draining in-flight transfers");
            control.quit();
        }
    });

    println!("logs in {}", task.root().display());
    println!("-- START --");

    while let Some(event) = handle.next_event().await {
        match event {
            SyncEvent::Created { key } => {
                println!("[ CREATED ] {key}");
                logs.created(key.as_str())?;
            }
            SyncEvent::MoveOn { key } => {
                if persist_marker {
                    println!("[ MOVEON  ] {key}");
                    task.save_marker(key.as_str())?;
                }
            }
            SyncEvent::Ignored { key } => {
                println!("[ IGNORED ] {key}");
                logs.ignored(key.as_str())?;
            }
            SyncEvent::Skipped { key } => {
                println!("[ SKIPPED ] {key}");
                logs.skipped(key.as_str())?;
            }
            SyncEvent::NonUtf8Name { parent, raw } => {
                let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
                println!("[ NO-UTF8-FILENAME ] {parent}:{hex}");
                logs.non_utf8(&parent, &raw)?;
            }
            SyncEvent::Warning { error, .. } => {
                println!("[ WARNING ] {error}");
                logs.error(&error)?;
            }
            SyncEvent::Failed { error, .. } => {
                println!("[ ERROR   ] {error}");
                logs.error(&error)?;
            }
            SyncEvent::End { stats } => {
                println!("-- END --");
                println!(
                    "total {} created and {} ignored",
                    stats.created, stats.ignored
                );
                println!("more logs in {}", task.root().display());
                return Ok(stats);
            }
        }
    }

    Err("event stream ended without a summary".into())
}
