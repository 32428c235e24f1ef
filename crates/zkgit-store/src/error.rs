use zkgit_types::TypeError;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested ref or object was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A ref name could not be written (invalid name, locked, ...).
    #[error("cannot write ref {name}: {reason}")]
    RefWrite { name: String, reason: String },

    /// An id coming out of the backend could not be converted.
    #[error("invalid object id: {0}")]
    InvalidId(#[from] TypeError),

    /// A shared lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Error reported by libgit2.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
