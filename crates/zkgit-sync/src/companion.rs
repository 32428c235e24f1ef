//! In-process companion.
//!
//! [`DirectoryCompanion`] implements [`ControlChannel`] against a local vault
//! directory instead of a TCP peer. It follows the same file conventions as
//! the real companion: archives are picked up from and delivered to the
//! shared temp root by file name. Each stored archive keeps its signature in
//! a `<name>.sig` file next to it, so several instances can share one vault.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use zkgit_crypto::RepoSignature;
use zkgit_protocol::{ControlChannel, ControlCommand, ControlResponse};

#[derive(Debug)]
pub struct DirectoryCompanion {
    temp_root: PathBuf,
    vault: PathBuf,
    connected: bool,
    offline: bool,
    log: Mutex<Vec<ControlCommand>>,
}

impl DirectoryCompanion {
    /// A connected companion storing snapshots under `vault`.
    pub fn new(temp_root: impl Into<PathBuf>, vault: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
            vault: vault.into(),
            connected: true,
            offline: false,
            log: Mutex::new(Vec::new()),
        }
    }

    /// A companion that is running but not connected to its remote.
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// A companion whose transfers never get an answer, as when the
    /// connection drops after the readiness check.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Commands received so far, oldest first.
    pub fn commands(&self) -> Vec<ControlCommand> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn has_snapshot(&self, name: &str) -> bool {
        self.vault.join(name).is_file()
    }

    fn note(&self, command: ControlCommand) {
        debug!(%command, "companion received");
        if let Ok(mut log) = self.log.lock() {
            log.push(command);
        }
    }

    fn signature_path(&self, name: &str) -> PathBuf {
        self.vault.join(format!("{name}.sig"))
    }

    fn stored_signature(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.signature_path(name)).ok()
    }

    fn store(&self, name: &str, signature: &RepoSignature) -> Result<(), String> {
        fs::create_dir_all(&self.vault).map_err(|e| e.to_string())?;
        copy_file(&self.temp_root.join(name), &self.vault.join(name))?;
        fs::write(self.signature_path(name), signature.to_hex()).map_err(|e| e.to_string())
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), String> {
    fs::copy(from, to).map(|_| ()).map_err(|e| format!("{}: {e}", from.display()))
}

#[async_trait]
impl ControlChannel for DirectoryCompanion {
    async fn is_reachable(&self) -> bool {
        true
    }

    async fn status(&self) -> ControlResponse {
        self.note(ControlCommand::Status);
        if self.connected {
            ControlResponse::Success
        } else {
            ControlResponse::Failure("ERROR not connected".into())
        }
    }

    async fn send_snapshot(&self, path: &str, signature: &RepoSignature) -> ControlResponse {
        self.note(ControlCommand::Send { path: path.to_string(), signature: *signature });
        if self.offline {
            return ControlResponse::Unreachable("connection reset".into());
        }
        match self.store(path, signature) {
            Ok(()) => ControlResponse::Success,
            Err(e) => ControlResponse::Failure(format!("ERROR {e}")),
        }
    }

    async fn request_snapshot(&self, name: &str, signature: &RepoSignature) -> ControlResponse {
        self.note(ControlCommand::Request { name: name.to_string(), signature: *signature });
        if self.offline {
            return ControlResponse::Unreachable("connection reset".into());
        }
        match self.stored_signature(name) {
            None => ControlResponse::NotFound,
            Some(stored) if stored == signature.to_hex() => ControlResponse::UpToDate,
            Some(_) => match copy_file(&self.vault.join(name), &self.temp_root.join(name)) {
                Ok(()) => ControlResponse::Success,
                Err(e) => ControlResponse::Failure(format!("ERROR {e}")),
            },
        }
    }

    async fn cleanup(&self, name: &str) -> ControlResponse {
        self.note(ControlCommand::Clean { name: name.to_string() });
        match fs::remove_file(self.temp_root.join(name)) {
            Ok(()) => ControlResponse::Success,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ControlResponse::Success,
            Err(e) => ControlResponse::Failure(format!("ERROR {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zkgit_crypto::SignatureEngine;
    use zkgit_types::ObjectId;

    fn sig(seed: u8) -> RepoSignature {
        SignatureEngine::compute([ObjectId::from_hash([seed; 20])])
    }

    #[tokio::test]
    async fn stores_and_returns_snapshots() {
        let root = TempDir::new().unwrap();
        let companion = DirectoryCompanion::new(root.path(), root.path().join("vault"));

        assert_eq!(
            companion.request_snapshot("r.tar.gz", &sig(1)).await,
            ControlResponse::NotFound
        );

        fs::write(root.path().join("r.tar.gz"), b"archive").unwrap();
        assert!(companion.send_snapshot("r.tar.gz", &sig(1)).await.is_success());
        assert!(companion.has_snapshot("r.tar.gz"));
        fs::remove_file(root.path().join("r.tar.gz")).unwrap();

        assert!(companion.request_snapshot("r.tar.gz", &sig(1)).await.is_up_to_date());
        assert!(companion.request_snapshot("r.tar.gz", &sig(2)).await.is_success());
        assert_eq!(fs::read(root.path().join("r.tar.gz")).unwrap(), b"archive");

        assert!(companion.cleanup("r.tar.gz").await.is_success());
        assert!(!root.path().join("r.tar.gz").exists());
        assert_eq!(companion.commands().len(), 5);
    }

    #[tokio::test]
    async fn send_without_archive_fails() {
        let root = TempDir::new().unwrap();
        let companion = DirectoryCompanion::new(root.path(), root.path().join("vault"));
        let response = companion.send_snapshot("missing.tar.gz", &sig(1)).await;
        assert!(matches!(response, ControlResponse::Failure(_)));
    }

    #[tokio::test]
    async fn offline_companion_answers_nothing() {
        let root = TempDir::new().unwrap();
        let companion = DirectoryCompanion::new(root.path(), root.path().join("v")).offline();
        let response = companion.request_snapshot("r.tar.gz", &sig(1)).await;
        assert!(matches!(response, ControlResponse::Unreachable(_)));
        assert_eq!(companion.commands().len(), 1);
    }

    #[tokio::test]
    async fn disconnected_companion_fails_readiness() {
        let root = TempDir::new().unwrap();
        let companion = DirectoryCompanion::new(root.path(), root.path().join("v")).disconnected();
        assert!(companion.ensure_ready().await.is_err());
    }
}
