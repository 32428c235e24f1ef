//! Reconciliation engine for the zkgit remote helper.
//!
//! Keeps two repository views in step: the caller's local repository and a
//! staging repository that is shipped to and from the companion process as a
//! whole snapshot.
//!
//! - [`ObjectSync`] mirrors object files between the two, skipping anything
//!   already present and verifying every copy.
//! - [`Session`] applies fast-forward-safe ref writes and remembers what was
//!   pushed during this invocation.
//! - [`Reconciler`] combines both with the control channel into the `list`,
//!   `push` and `fetch` operations.

pub mod companion;
pub mod error;
pub mod object_sync;
pub mod reconciler;
pub mod session;
pub mod snapshot;
pub mod types;
pub mod verifier;
pub mod workspace;

pub use companion::DirectoryCompanion;
pub use error::{SyncError, SyncResult};
pub use object_sync::{ObjectSync, DEFAULT_WORKERS};
pub use reconciler::Reconciler;
pub use session::Session;
pub use types::{ListOutcome, SyncReport};
pub use verifier::ObjectVerifier;
pub use workspace::{local_repo_path, Workspace, DEFAULT_ARCHIVE_SUFFIX, DEFAULT_STAGING_PREFIX};
