//! Restore command implementation.

use super::RunArgs;
use crate::task::{TaskIdentity, TaskState};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tidesync_engine::RestoreOptions;
use tidesync_store::DirStore;

/// Runs a restore: local directory to store root.
pub async fn run(
    store_root: &Path,
    directory: &Path,
    max_queue: usize,
    args: RunArgs,
    state_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let meta = std::fs::metadata(directory)
        .map_err(|_| format!("directory {} is not found", directory.display()))?;
    if !meta.is_dir() {
        return Err(format!("{} is not a directory", directory.display()).into());
    }

    let store = Arc::new(DirStore::open_with_create(store_root)?);
    let task = TaskState::open(
        state_dir,
        &TaskIdentity {
            action: "restore",
            store: store_root,
            directory,
            prefix: None,
        },
    )?;
    tracing::debug!(task = %task.root().display(), "task state resolved");

    let mut options = RestoreOptions::new(directory)
        .with_max_retries(args.retry)
        .with_max_queue_depth(max_queue);
    if let Some(concurrency) = args.concurrency {
        options = options.with_max_concurrency(concurrency);
    }
    if let Some(max_errors) = args.max_errors {
        options = options.with_max_errors(max_errors);
    }
    if let Some(max_items) = args.max_items {
        options = options.with_max_items(max_items);
    }

    if args.fill {
        let keys = task.take_fill_keys()?;
        if keys.is_empty() {
            println!("nothing to fill: no previously ignored objects recorded");
            return Ok(());
        }
        options = options.with_explicit_keys(keys);
    } else if !args.start_over {
        if let Some(marker) = task.load_marker()? {
            options = options.with_resume_marker(marker);
        }
    }

    let handle = tidesync_engine::restore(store, options);
    let stats = super::drive(handle, &task, !args.fill).await?;

    if args.fill {
        task.clear_fill_backup()?;
    }
    if stats.ignored > 0 {
        return Err(format!("{} objects ignored", stats.ignored).into());
    }
    Ok(())
}
