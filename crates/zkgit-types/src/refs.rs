//! Named references as seen through the remote-helper protocol.
//!
//! A ref is either direct (pointing at a commit id) or symbolic (pointing at
//! another ref by name, as `HEAD` normally does).

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;

/// Name of the symbolic default-branch pointer.
pub const HEAD: &str = "HEAD";

/// What a ref points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefTarget {
    /// Points directly at a commit.
    Direct(ObjectId),
    /// Points at another ref by name (e.g. `refs/heads/main`).
    Symbolic(String),
}

/// A named reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Canonical name (e.g. "refs/heads/main").
    pub name: String,
    pub target: RefTarget,
}

impl Ref {
    pub fn direct(name: impl Into<String>, id: ObjectId) -> Self {
        Self { name: name.into(), target: RefTarget::Direct(id) }
    }

    pub fn symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self { name: name.into(), target: RefTarget::Symbolic(target.into()) }
    }

    /// Returns the commit id for a direct ref.
    pub fn object_id(&self) -> Option<ObjectId> {
        match &self.target {
            RefTarget::Direct(id) => Some(*id),
            RefTarget::Symbolic(_) => None,
        }
    }

    /// Returns the target name for a symbolic ref.
    pub fn symbolic_target(&self) -> Option<&str> {
        match &self.target {
            RefTarget::Direct(_) => None,
            RefTarget::Symbolic(name) => Some(name),
        }
    }

    /// Returns the short name of this ref (without the `refs/heads/` prefix).
    pub fn short_name(&self) -> &str {
        self.name.strip_prefix("refs/heads/").unwrap_or(&self.name)
    }
}
