//! Reconciliation of the local repository with the staging repository.
//!
//! The companion only ever sees the staging repository. `list` refreshes it
//! from the companion's snapshot, `push` moves objects and refs from local
//! into it and uploads it, `fetch` moves objects back out.

use tokio::task;
use tracing::{debug, info, warn};
use zkgit_crypto::{RepoSignature, SignatureEngine};
use zkgit_protocol::{ControlChannel, ControlResponse, FetchRequest};
use zkgit_store::ObjectStore;
use zkgit_types::{PushSpec, HEAD};

use crate::error::{SyncError, SyncResult};
use crate::object_sync::ObjectSync;
use crate::session::Session;
use crate::snapshot;
use crate::types::{ListOutcome, SyncReport};
use crate::workspace::Workspace;

/// Drives list, push and fetch for one repository.
///
/// `L` is the caller's repository, `S` the staging repository and `C` the
/// channel to the companion.
pub struct Reconciler<L, S, C> {
    local: L,
    staging: S,
    channel: C,
    workspace: Workspace,
    objects: ObjectSync,
    session: Session,
}

impl<L, S, C> Reconciler<L, S, C>
where
    L: ObjectStore,
    S: ObjectStore,
    C: ControlChannel,
{
    pub fn new(local: L, staging: S, channel: C, workspace: Workspace, objects: ObjectSync) -> Self {
        Self { local, staging, channel, workspace, objects, session: Session::new() }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn staging(&self) -> &S {
        &self.staging
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Signature of the local history reachable from `HEAD`, optionally
    /// leaving out the `HEAD` commit itself.
    pub fn signature(&self, include_head: bool) -> SyncResult<RepoSignature> {
        let commits = self.local.walk_reachable_commits(HEAD)?;
        let exclude = if include_head { None } else { self.local.resolve(HEAD)? };
        Ok(SignatureEngine::compute_excluding(commits, exclude))
    }

    /// Refresh staging from the companion and report its branches.
    ///
    /// Only an explicit "no snapshot" answer lets the remote count as empty.
    /// A failed or unanswered request is an error: listing a stale staging
    /// view would let the next push overwrite history it never saw.
    pub async fn list(&mut self, for_push: bool) -> SyncResult<ListOutcome> {
        let signature = self.signature(for_push)?;
        info!(for_push, "requesting snapshot");
        let mut response = self.request_snapshot(&signature).await;
        if response.is_up_to_date() && self.staging.list_branches()?.is_empty() {
            info!("companion up to date but staging is empty, requesting full snapshot");
            response = self.request_snapshot(&RepoSignature::UNMATCHED).await;
        }
        match response {
            ControlResponse::Success => self.unpack_snapshot().await?,
            ControlResponse::UpToDate => info!("staging already up to date"),
            ControlResponse::NotFound => {
                info!("companion holds no snapshot");
                self.clear_staging_branches()?;
            }
            other => return Err(SyncError::SnapshotUnavailable(other.to_string())),
        }

        let refs = self.staging.list_branches()?;
        if refs.is_empty() {
            debug!("staging has no branches, next push is the first");
            self.session.mark_first_push();
        }

        let head = if for_push || refs.is_empty() {
            None
        } else {
            let head = self.local.read_symbolic_ref(HEAD)?;
            if head.is_none() {
                info!("no default branch on local HEAD");
            }
            head
        };
        Ok(ListOutcome { refs, head })
    }

    /// Apply one push spec to staging and upload the result.
    pub async fn push(&mut self, spec: &PushSpec) -> SyncResult<()> {
        if spec.is_delete() {
            let existed = self.staging.delete_branch(&spec.dst, true)?;
            self.session.forget(&spec.dst);
            debug!(dst = %spec.dst, existed, "branch deleted");
            return self.upload().await;
        }

        info!(src = %spec.src, dst = %spec.dst, force = spec.force, "preparing push");
        let report = self
            .objects
            .copy_missing(&self.local.objects_dir(), &self.staging.objects_dir())
            .await?;
        if !report.is_complete() {
            warn!(failed = report.failed.len(), "some objects were not copied to staging");
        }

        let id = self
            .local
            .resolve(&spec.src)?
            .ok_or_else(|| SyncError::SourceNotFound(spec.src.clone()))?;
        self.session.write_ref(&self.staging, id, &spec.dst, spec.force)?;

        if self.session.is_first_push() {
            self.bootstrap_default_branch(&spec.dst);
        }

        self.upload().await?;
        self.session.clear_first_push();
        info!(dst = %spec.dst, id = %id.short_hex(), "push completed");
        Ok(())
    }

    /// Make the objects for `requests` available in the local repository.
    ///
    /// Refs are left to git, which updates them once the objects exist.
    pub async fn fetch(&mut self, requests: &[FetchRequest]) -> SyncResult<SyncReport> {
        let report = self
            .objects
            .copy_missing(&self.staging.objects_dir(), &self.local.objects_dir())
            .await?;
        self.local.refresh()?;
        for request in requests {
            if self.local.resolve(&request.id.to_hex())?.is_none() {
                warn!(id = %request.id, name = %request.name, "fetched commit not found locally");
            }
        }
        Ok(report)
    }

    /// Ask the companion to drop its temporary copy of the archive.
    pub async fn cleanup(&self) -> ControlResponse {
        self.channel.cleanup(&self.workspace.archive_name()).await
    }

    /// First push: point `HEAD` at the pushed branch, locally and in staging,
    /// so clones get a default branch. Failures are logged only.
    fn bootstrap_default_branch(&self, dst: &str) {
        match self.local.read_symbolic_ref(HEAD) {
            Ok(Some(_)) => link_head(&self.local, dst, "local"),
            Ok(None) => warn!("first push but no branch to set remote HEAD"),
            Err(e) => warn!(error = %e, "cannot read local HEAD"),
        }
        link_head(&self.staging, dst, "staging");
    }

    async fn request_snapshot(&self, signature: &RepoSignature) -> ControlResponse {
        self.channel
            .request_snapshot(&self.workspace.archive_name(), signature)
            .await
    }

    fn clear_staging_branches(&mut self) -> SyncResult<()> {
        for branch in self.staging.list_branches()? {
            self.staging.delete_branch(&branch.name, true)?;
            debug!(name = %branch.name, "stale staging branch dropped");
        }
        Ok(())
    }

    async fn unpack_snapshot(&mut self) -> SyncResult<()> {
        let archive = self.workspace.archive_path();
        let staging = self.workspace.staging_dir();
        task::spawn_blocking(move || snapshot::unpack(&archive, &staging)).await??;
        self.staging.refresh()?;
        info!("snapshot retrieved into staging");
        Ok(())
    }

    async fn upload(&mut self) -> SyncResult<()> {
        let signature = self.signature(true)?;
        let archive = self.workspace.archive_path();
        let staging = self.workspace.staging_dir();
        let size = task::spawn_blocking(move || snapshot::pack(&staging, &archive)).await??;
        debug!(size, "staging archived");

        match self
            .channel
            .send_snapshot(&self.workspace.archive_name(), &signature)
            .await
        {
            ControlResponse::Success => {
                info!("transfer completed");
                Ok(())
            }
            other => Err(SyncError::TransferFailed(other.to_string())),
        }
    }
}

fn link_head<T: ObjectStore>(store: &T, dst: &str, view: &str) {
    match store.link_symbolic_ref(HEAD, dst) {
        Ok(outcome) if outcome.is_success() => debug!(view, dst, %outcome, "HEAD linked"),
        Ok(outcome) => warn!(view, dst, %outcome, "failed to set HEAD"),
        Err(e) => warn!(view, dst, error = %e, "failed to set HEAD"),
    }
}
