use std::path::PathBuf;

use zkgit_types::Ref;

/// Outcome of one Object Sync pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files copied and verified.
    pub copied: usize,
    /// Files already present at the target.
    pub skipped: usize,
    /// Target paths whose copy failed or did not verify.
    pub failed: Vec<PathBuf>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What `list` reports back to git.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOutcome {
    /// Branches of the staging view, sorted by name.
    pub refs: Vec<Ref>,
    /// Target of the local `HEAD`, when it should be advertised.
    pub head: Option<String>,
}
