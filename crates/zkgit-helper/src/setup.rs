//! Session start: locate the repositories and make sure the companion is up.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use zkgit_protocol::{ControlChannel, ProtocolError, TcpControlChannel};
use zkgit_store::GitObjectStore;
use zkgit_sync::{local_repo_path, Reconciler};
use zkgit_types::{repo_name_from_url, RemoteEndpoint};

use crate::cli::Cli;
use crate::config::HelperConfig;
use crate::engine::RemoteHelper;

pub type GitRemoteHelper = RemoteHelper<GitObjectStore, GitObjectStore, TcpControlChannel>;

pub fn endpoint(url: &str, config: &HelperConfig) -> Result<RemoteEndpoint> {
    let endpoint = match config.port {
        Some(port) => RemoteEndpoint::new(port),
        None => RemoteEndpoint::from_url(url),
    };
    if endpoint.is_unset() {
        return Err(ProtocolError::MissingPort).with_context(|| format!("cannot use remote {url}"));
    }
    Ok(endpoint)
}

/// Open the caller's repository.
pub fn open_local(dir: Option<&Path>, repo_name: &str) -> Result<GitObjectStore> {
    if let Some(dir) = dir {
        let path = local_repo_path(dir, repo_name);
        return GitObjectStore::open(&path)
            .with_context(|| format!("failed to open repository at {}", path.display()));
    }
    if let Some(git_dir) = env::var_os("GIT_DIR") {
        let path = Path::new(&git_dir);
        return GitObjectStore::open(path)
            .with_context(|| format!("failed to open GIT_DIR {}", path.display()));
    }
    let cwd = env::current_dir()?;
    GitObjectStore::discover(&cwd)
        .with_context(|| format!("no repository found from {}", cwd.display()))
}

/// Everything that must hold before the first command is read.
pub async fn start(cli: &Cli, config: &HelperConfig) -> Result<GitRemoteHelper> {
    let endpoint = endpoint(&cli.url, config)?;
    let channel = TcpControlChannel::new(endpoint, config.channel_config());
    channel.ensure_ready().await?;

    let repo_name = repo_name_from_url(&cli.url);
    let local = open_local(cli.dir.as_deref(), &repo_name)?;

    let workspace = config.workspace(&repo_name);
    let staging_dir = workspace.prepare()?;
    let staging = GitObjectStore::open_or_init_bare(&staging_dir)
        .with_context(|| format!("failed to prepare staging at {}", staging_dir.display()))?;
    info!(
        repo = %repo_name,
        local = %local.git_dir().display(),
        staging = %staging_dir.display(),
        "session ready"
    );

    let reconciler = Reconciler::new(local, staging, channel, workspace, config.object_sync());
    Ok(RemoteHelper::new(reconciler, config.clean_on_exit))
}
