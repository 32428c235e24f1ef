use std::fmt;
use std::path::PathBuf;

use zkgit_types::{ObjectId, Ref};

use crate::error::StoreResult;

/// Result of a low-level ref update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefUpdateOutcome {
    /// The ref did not exist and was created.
    New,
    /// The ref was moved to a non-descendant because force was requested.
    Forced,
    /// The ref moved forward to a descendant of its old value.
    FastForward,
    /// The ref already held the requested value.
    NoChange,
    /// The update was refused (not a fast-forward and not forced).
    Rejected,
}

impl RefUpdateOutcome {
    /// Returns `true` if the ref now holds the requested value.
    pub fn is_success(&self) -> bool {
        !matches!(self, RefUpdateOutcome::Rejected)
    }
}

impl fmt::Display for RefUpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefUpdateOutcome::New => "NEW",
            RefUpdateOutcome::Forced => "FORCED",
            RefUpdateOutcome::FastForward => "FAST_FORWARD",
            RefUpdateOutcome::NoChange => "NO_CHANGE",
            RefUpdateOutcome::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Repository capabilities the helper consumes.
///
/// One instance wraps one repository view (Local or Staging). Implementations
/// are moved between tasks but never shared, so only `Send` is required.
pub trait ObjectStore: Send {
    /// Directory holding the repository's loose objects (`<git-dir>/objects`).
    fn objects_dir(&self) -> PathBuf;

    /// Resolve a ref name or hex id to an object id.
    ///
    /// Returns `Ok(None)` if nothing matches (including an unborn `HEAD`).
    fn resolve(&self, spec: &str) -> StoreResult<Option<ObjectId>>;

    /// Returns `true` if `ancestor` is `descendant` or lies in its history.
    fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> StoreResult<bool>;

    /// Read the target name of a symbolic ref.
    ///
    /// Returns `Ok(None)` if the ref is missing or direct.
    fn read_symbolic_ref(&self, name: &str) -> StoreResult<Option<String>>;

    /// List all local branch refs (`refs/heads/*`), sorted by name.
    fn list_branches(&self) -> StoreResult<Vec<Ref>>;

    /// Point `name` at `new_id`.
    ///
    /// Without `force` only creations and fast-forwards are applied; anything
    /// else yields [`RefUpdateOutcome::Rejected`] and leaves the ref alone.
    fn update_ref(&self, name: &str, new_id: &ObjectId, force: bool)
        -> StoreResult<RefUpdateOutcome>;

    /// Make `name` a symbolic ref pointing at `target`.
    fn link_symbolic_ref(&self, name: &str, target: &str) -> StoreResult<RefUpdateOutcome>;

    /// Delete a branch ref. Returns `true` if it existed.
    fn delete_branch(&self, name: &str, force: bool) -> StoreResult<bool>;

    /// Every commit reachable from `start`, in traversal order.
    ///
    /// An unresolvable `start` yields an empty history.
    fn walk_reachable_commits(&self, start: &str) -> StoreResult<Vec<ObjectId>>;

    /// Drop cached state after the repository changed on disk underneath us.
    fn refresh(&mut self) -> StoreResult<()> {
        Ok(())
    }
}
