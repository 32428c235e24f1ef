//! Scratch locations for one repository.
//!
//! Staging lives at `<temp_root>/<prefix><repo>` and the transient snapshot
//! archive at `<temp_root>/<repo><suffix>`. The companion shares `temp_root`,
//! so only the archive's file name crosses the control channel.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SyncResult;

pub const DEFAULT_STAGING_PREFIX: &str = "zkgit-tmp-";
pub const DEFAULT_ARCHIVE_SUFFIX: &str = ".tar.gz";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    repo_name: String,
    temp_root: PathBuf,
    staging_prefix: String,
    archive_suffix: String,
}

impl Workspace {
    pub fn new(temp_root: impl Into<PathBuf>, repo_name: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            temp_root: temp_root.into(),
            staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
            archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string(),
        }
    }

    pub fn with_staging_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staging_prefix = prefix.into();
        self
    }

    pub fn with_archive_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.archive_suffix = suffix.into();
        self
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.temp_root.join(format!("{}{}", self.staging_prefix, self.repo_name))
    }

    /// Name sent in `SEND`/`REQUEST`/`CLEAN`.
    pub fn archive_name(&self) -> String {
        format!("{}{}", self.repo_name, self.archive_suffix)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.temp_root.join(self.archive_name())
    }

    /// Create the staging directory if it does not exist yet.
    pub fn prepare(&self) -> SyncResult<PathBuf> {
        let dir = self.staging_dir();
        fs::create_dir_all(&dir)?;
        debug!(staging = %dir.display(), "staging directory ready");
        Ok(dir)
    }
}

/// Where the local repository lives when git passes a directory argument.
///
/// A directory already named after the repository is the repository;
/// otherwise the repository is expected inside it (the clone target case).
pub fn local_repo_path(dir: &Path, repo_name: &str) -> PathBuf {
    if dir.file_name().and_then(|n| n.to_str()) == Some(repo_name) {
        dir.to_path_buf()
    } else {
        dir.join(repo_name)
    }
}
