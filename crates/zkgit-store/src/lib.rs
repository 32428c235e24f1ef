//! Object store capability interface for the zkgit remote helper.
//!
//! The helper never reads or writes git's object encoding itself. Everything
//! it needs from a repository (ref resolution, ancestry, branch enumeration,
//! ref updates, history walks) goes through the [`ObjectStore`] trait.
//!
//! # Storage Backends
//!
//! - [`GitObjectStore`] -- an on-disk repository opened through `git2`
//! - [`InMemoryObjectStore`] -- a commit graph in a `HashMap`, for tests
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; the helper only copies them.
//! 2. Ref updates report a [`RefUpdateOutcome`] instead of failing on
//!    rejection, so callers decide how to surface a non-fast-forward.
//! 3. All I/O and git errors are propagated, never silently ignored.

pub mod error;
pub mod git;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use git::GitObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::{ObjectStore, RefUpdateOutcome};
