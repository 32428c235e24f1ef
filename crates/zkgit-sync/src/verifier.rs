use std::path::Path;

use tokio::fs;
use zkgit_crypto::ContentDigest;

use crate::error::{SyncError, SyncResult};

/// Checks that a copied object file matches its source byte for byte.
pub struct ObjectVerifier;

impl ObjectVerifier {
    /// Compare digests of `source` and `target`. On mismatch the target is
    /// removed so a later sync copies it again.
    pub async fn verify_copy(source: &Path, target: &Path) -> SyncResult<ContentDigest> {
        let expected = ContentDigest::of(&fs::read(source).await?);
        let copied = fs::read(target).await?;
        if expected.verify(&copied) {
            return Ok(expected);
        }
        let actual = ContentDigest::of(&copied);
        fs::remove_file(target).await?;
        Err(SyncError::IntegrityMismatch {
            path: target.to_path_buf(),
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn identical_copy_verifies() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        std::fs::write(&a, b"object").unwrap();
        std::fs::write(&b, b"object").unwrap();
        let digest = ObjectVerifier::verify_copy(&a, &b).await.unwrap();
        assert!(digest.verify(b"object"));
    }

    #[tokio::test]
    async fn mismatch_removes_target() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (dir.path().join("a"), dir.path().join("b"));
        std::fs::write(&a, b"object").unwrap();
        std::fs::write(&b, b"objecT").unwrap();
        let err = ObjectVerifier::verify_copy(&a, &b).await.unwrap_err();
        assert!(matches!(err, SyncError::IntegrityMismatch { ref path, .. } if path == &b));
        assert!(!b.exists());
    }
}
