//! Repository signatures.
//!
//! A signature is the BLAKE3 digest of the sorted hex ids of every reachable
//! commit. It is only an equality token for "has anything changed since the
//! companion last saw this repository"; it says nothing about file contents.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use zkgit_types::ObjectId;

/// Order-independent digest over a set of commit ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSignature([u8; 32]);

impl RepoSignature {
    /// All zero bytes. No digest produced by [`SignatureEngine`] has this
    /// value, so a request carrying it always gets the full snapshot.
    pub const UNMATCHED: RepoSignature = RepoSignature([0; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, the form sent over the control channel.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RepoSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoSignature({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for RepoSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes [`RepoSignature`]s.
pub struct SignatureEngine;

impl SignatureEngine {
    /// Digest a set of commit ids.
    ///
    /// Ids are rendered as hex, deduplicated and sorted before hashing, so the
    /// traversal order of the caller never affects the result.
    pub fn compute<I>(commits: I) -> RepoSignature
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let sorted: BTreeSet<String> = commits.into_iter().map(|id| id.to_hex()).collect();
        let mut hasher = blake3::Hasher::new();
        for hex in &sorted {
            hasher.update(hex.as_bytes());
        }
        RepoSignature(*hasher.finalize().as_bytes())
    }

    /// Digest the commit set with `exclude` left out (the current tip when a
    /// fetch-style listing is prepared).
    pub fn compute_excluding<I>(commits: I, exclude: Option<ObjectId>) -> RepoSignature
    where
        I: IntoIterator<Item = ObjectId>,
    {
        Self::compute(commits.into_iter().filter(|id| Some(*id) != exclude))
    }
}
