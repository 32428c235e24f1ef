//! Content-addressed copying of object files between repositories.
//!
//! Every regular file under the source objects directory is mirrored to the
//! same relative path under the target. Files already present are skipped:
//! object files are named by their content, so presence implies equality.
//! Nothing is ever deleted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};
use crate::types::SyncReport;
use crate::verifier::ObjectVerifier;

pub const DEFAULT_WORKERS: usize = 5;

/// Bounded pool of object copies.
#[derive(Clone, Debug)]
pub struct ObjectSync {
    workers: usize,
}

impl Default for ObjectSync {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ObjectSync {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Copy every object file missing from `target`.
    ///
    /// Returns once all copies have finished. A failed copy is logged and
    /// recorded in the report; it never cancels its siblings.
    pub async fn copy_missing(&self, source: &Path, target: &Path) -> SyncResult<SyncReport> {
        let (src, dst) = (source.to_path_buf(), target.to_path_buf());
        let (pending, skipped) = task::spawn_blocking(move || plan(&src, &dst)).await?;
        let mut report = SyncReport { skipped, ..Default::default() };
        if pending.is_empty() {
            debug!(source = %source.display(), skipped, "no objects to copy");
            return Ok(report);
        }

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut copies = JoinSet::new();
        for (from, to) in pending {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SyncError::WorkerPool(e.to_string()))?;
            copies.spawn(async move {
                let _permit = permit;
                let result = copy_object(&from, &to).await;
                (to, result)
            });
        }

        while let Some(joined) = copies.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.copied += 1,
                Ok((path, Err(e))) => {
                    warn!(path = %path.display(), error = %e, "object copy failed");
                    report.failed.push(path);
                }
                Err(e) => warn!(error = %e, "object copy task aborted"),
            }
        }

        info!(
            copied = report.copied,
            skipped = report.skipped,
            failed = report.failed.len(),
            "objects synchronised"
        );
        Ok(report)
    }
}

/// Split the source tree into pending `(from, to)` copies and a skip count.
fn plan(source: &Path, target: &Path) -> (Vec<(PathBuf, PathBuf)>, usize) {
    let mut pending = Vec::new();
    let mut skipped = 0;
    if !source.is_dir() {
        return (pending, skipped);
    }
    for entry in WalkDir::new(source) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "failed to walk objects directory");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        if destination.exists() {
            skipped += 1;
            continue;
        }
        pending.push((entry.into_path(), destination));
    }
    (pending, skipped)
}

async fn copy_object(from: &Path, to: &Path) -> SyncResult<()> {
    if let Some(parent) = to.parent() {
        // Concurrent callers may race on the same fan-out directory.
        fs::create_dir_all(parent).await?;
    }
    fs::copy(from, to).await?;
    ObjectVerifier::verify_copy(from, to).await?;
    Ok(())
}
