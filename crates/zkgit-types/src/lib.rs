//! Foundation types for the zkgit remote helper.
//!
//! Every other zkgit crate depends on `zkgit-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content hash of a git object (commit, tree, blob)
//! - [`Ref`] / [`RefTarget`]: A named ref, direct or symbolic
//! - [`PushSpec`]: One `<+?src>:<dst>` push request
//! - [`RemoteEndpoint`]: Loopback address of the companion process

pub mod endpoint;
pub mod error;
pub mod object;
pub mod push;
pub mod refs;

pub use endpoint::{repo_name_from_url, RemoteEndpoint, COMPANION_HOST};
pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
pub use push::PushSpec;
pub use refs::{Ref, RefTarget, HEAD};
