//! Backup command implementation.

use super::RunArgs;
use crate::task::{TaskIdentity, TaskState};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tidesync_engine::BackupOptions;
use tidesync_store::DirStore;

/// Runs a backup: store root to local directory.
pub async fn run(
    store_root: &Path,
    directory: &Path,
    prefix: Option<String>,
    force: bool,
    args: RunArgs,
    state_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    match std::fs::metadata(directory) {
        Ok(meta) => {
            if !force {
                return Err(format!(
                    "directory {} already exists, use --force to overwrite",
                    directory.display()
                )
                .into());
            }
            // An obstacle file in place of the mirror root goes first.
            if !meta.is_dir() {
                std::fs::remove_file(directory)?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let store = Arc::new(DirStore::open(store_root)?);
    let task = TaskState::open(
        state_dir,
        &TaskIdentity {
            action: "backup",
            store: store_root,
            directory,
            prefix: prefix.as_deref(),
        },
    )?;
    tracing::debug!(task = %task.root().display(), "task state resolved");

    let mut options = BackupOptions::new(directory).with_max_retries(args.retry);
    if let Some(prefix) = prefix {
        options = options.with_prefix(prefix);
    }
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

    let handle = tidesync_engine::backup(store, options);
    let stats = super::drive(handle, &task, !args.fill).await?;

    if args.fill {
        task.clear_fill_backup()?;
    }
    if stats.ignored > 0 {
        return Err(format!("{} objects ignored", stats.ignored).into());
    }
    Ok(())
}
