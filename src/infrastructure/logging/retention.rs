//! Retention cleanup for rolled log files.
//!
//! `tracing-appender` rolls `traitscope.log` into date-suffixed siblings
//! (`traitscope.log.2024-05-01`) but never deletes them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::logger::LOG_FILE_NAME;

/// Whether `name` is a rolled sibling of the log file (`traitscope.log.<suffix>`).
fn is_rolled_log(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_NAME)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|suffix| !suffix.is_empty())
}

/// Delete rolled log files in `log_dir` last modified more than
/// `retention_days` ago. Returns the number of files removed.
///
/// The unsuffixed log file and the newest rolled file are never removed;
/// depending on the rotation policy one of them is being written to.
pub async fn prune_expired_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        debug!(path = %log_dir.display(), "log directory does not exist");
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));

    let mut rolled: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .context("failed to read log directory")?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .context("failed to read directory entry")?
    {
        let path = entry.path();
        let rolled_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_rolled_log);
        if !rolled_log {
            continue;
        }

        let modified: DateTime<Utc> = entry
            .metadata()
            .await
            .context("failed to get file metadata")?
            .modified()
            .context("failed to get file modification time")?
            .into();
        rolled.push((path, modified));
    }

    // Newest first; the head may be the active file.
    rolled.sort_by(|a, b| b.1.cmp(&a.1));

    let mut deleted = 0;
    for (path, modified) in rolled.iter().skip(1) {
        if *modified < cutoff {
            tokio::fs::remove_file(path)
                .await
                .context("failed to delete old log file")?;
            debug!(path = %path.display(), "deleted expired log file");
            deleted += 1;
        }
    }

    if deleted > 0 {
        info!(count = deleted, "cleaned up old log files");
    }
    Ok(deleted)
}
