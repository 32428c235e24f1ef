use std::path::PathBuf;

use thiserror::Error;
use zkgit_store::{RefUpdateOutcome, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    /// Rendered verbatim in `error <dst> <reason>` lines; git recognises
    /// exactly this text as a fast-forward rejection.
    #[error("non-fast forward")]
    NonFastForward { name: String },

    #[error("Cannot write ref - RefUpdate failed with result: {outcome}")]
    CannotWriteRef { name: String, outcome: RefUpdateOutcome },

    #[error("source ref not found: {0}")]
    SourceNotFound(String),

    #[error("integrity mismatch for {}: expected {expected}, found {actual}", .path.display())]
    IntegrityMismatch { path: PathBuf, expected: String, actual: String },

    /// The companion neither delivered a snapshot nor said it has none.
    #[error("snapshot request failed: {0}")]
    SnapshotUnavailable(String),

    #[error("snapshot transfer failed: {0}")]
    TransferFailed(String),

    #[error("object copy pool closed: {0}")]
    WorkerPool(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
