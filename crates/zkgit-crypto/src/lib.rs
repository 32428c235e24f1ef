//! Hashing primitives for the zkgit remote helper.
//!
//! Provides the order-independent [`RepoSignature`] used to tell the companion
//! process whether its stored snapshot is current, and [`ContentDigest`] used
//! to verify object copies.
//!
//! All hashing wraps BLAKE3; no custom cryptography.

pub mod hasher;
pub mod signature;

pub use hasher::ContentDigest;
pub use signature::{RepoSignature, SignatureEngine};
