use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zkgit_protocol::ChannelConfig;
use zkgit_sync::{ObjectSync, Workspace, DEFAULT_ARCHIVE_SUFFIX, DEFAULT_STAGING_PREFIX, DEFAULT_WORKERS};

use crate::cli::Cli;

/// Helper settings. Lowest to highest precedence: defaults, the TOML file,
/// command-line flags and their environment variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    /// Overrides the port taken from the remote URL.
    pub port: Option<u16>,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
    pub workers: usize,
    pub temp_root: PathBuf,
    pub staging_prefix: String,
    pub archive_suffix: String,
    pub clean_on_exit: bool,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            port: None,
            connect_timeout_secs: 5,
            io_timeout_secs: 300,
            workers: DEFAULT_WORKERS,
            temp_root: std::env::temp_dir(),
            staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
            archive_suffix: DEFAULT_ARCHIVE_SUFFIX.to_string(),
            clean_on_exit: false,
        }
    }
}

impl HelperConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Defaults, then the config file named on the command line, then flags.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(cli);
        Ok(config)
    }

    fn apply(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(secs) = cli.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = cli.io_timeout_secs {
            self.io_timeout_secs = secs;
        }
        if let Some(root) = &cli.temp_root {
            self.temp_root = root.clone();
        }
        self.clean_on_exit |= cli.clean_on_exit;
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            io_timeout: Duration::from_secs(self.io_timeout_secs),
        }
    }

    pub fn workspace(&self, repo_name: &str) -> Workspace {
        Workspace::new(&self.temp_root, repo_name)
            .with_staging_prefix(&self.staging_prefix)
            .with_archive_suffix(&self.archive_suffix)
    }

    pub fn object_sync(&self) -> ObjectSync {
        ObjectSync::new(self.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["git-remote-zkgit", "origin", "zkgit://localhost:8451/r.git"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults() {
        let c = HelperConfig::default();
        assert_eq!(c.port, None);
        assert_eq!(c.workers, 5);
        assert_eq!(c.channel_config(), ChannelConfig::default());
        assert_eq!(c.staging_prefix, "zkgit-tmp-");
        assert_eq!(c.archive_suffix, ".tar.gz");
        assert!(!c.clean_on_exit);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zkgit.toml");
        fs::write(&path, "workers = 2\narchive_suffix = \".tgz\"\nport = 9000\n").unwrap();

        let c = HelperConfig::load(&path).unwrap();
        assert_eq!(c.workers, 2);
        assert_eq!(c.archive_suffix, ".tgz");
        assert_eq!(c.port, Some(9000));
        assert_eq!(c.io_timeout_secs, 300);
    }

    #[test]
    fn flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zkgit.toml");
        fs::write(&path, "workers = 2\nio_timeout_secs = 10\n").unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let c = HelperConfig::resolve(&cli(&["--config", &path_arg, "--workers", "9"])).unwrap();
        assert_eq!(c.workers, 9);
        assert_eq!(c.io_timeout_secs, 10);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("none.toml");
        assert!(HelperConfig::load(&missing).is_err());
        fs::write(dir.path().join("bad.toml"), "workers = \"many\"").unwrap();
        assert!(HelperConfig::load(&dir.path().join("bad.toml")).is_err());
    }

    #[test]
    fn workspace_uses_configured_naming() {
        let c = HelperConfig {
            temp_root: PathBuf::from("/scratch"),
            staging_prefix: "s-".into(),
            ..Default::default()
        };
        let ws = c.workspace("repo");
        assert_eq!(ws.staging_dir(), PathBuf::from("/scratch/s-repo"));
        assert_eq!(ws.archive_name(), "repo.tar.gz");
    }
}
