//! The remote-helper command loop.
//!
//! Reads one command per line, dispatches it to the [`Reconciler`] and writes
//! git's expected replies. Every response block ends with one blank line; a
//! blank line at the top level (or end of input) ends the session.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, info, warn};
use zkgit_protocol::{capabilities, ControlChannel, FetchRequest, HelperCommand, HelperReply};
use zkgit_store::ObjectStore;
use zkgit_sync::Reconciler;
use zkgit_types::PushSpec;

pub struct RemoteHelper<L, S, C> {
    reconciler: Reconciler<L, S, C>,
    clean_on_exit: bool,
}

impl<L, S, C> RemoteHelper<L, S, C>
where
    L: ObjectStore,
    S: ObjectStore,
    C: ControlChannel,
{
    pub fn new(reconciler: Reconciler<L, S, C>, clean_on_exit: bool) -> Self {
        Self { reconciler, clean_on_exit }
    }

    pub fn reconciler(&self) -> &Reconciler<L, S, C> {
        &self.reconciler
    }

    /// Serve git until the terminating blank line.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            debug!(%line, "command");
            match HelperCommand::parse(&line)? {
                HelperCommand::Blank => break,
                HelperCommand::Capabilities => {
                    for &name in capabilities::ADVERTISED {
                        emit(output, &HelperReply::Capability(name)).await?;
                    }
                }
                HelperCommand::List { for_push } => self.list(for_push, output).await?,
                HelperCommand::Push(spec) => {
                    let specs = read_batch(&mut lines, spec, |cmd| match cmd {
                        HelperCommand::Push(spec) => Some(spec),
                        _ => None,
                    })
                    .await?;
                    self.push(&specs, output).await?;
                }
                HelperCommand::Fetch(request) => {
                    let requests = read_batch(&mut lines, request, |cmd| match cmd {
                        HelperCommand::Fetch(request) => Some(request),
                        _ => None,
                    })
                    .await?;
                    self.fetch(&requests).await?;
                }
            }
            emit(output, &HelperReply::End).await?;
            output.flush().await?;
        }

        if self.clean_on_exit {
            let response = self.reconciler.cleanup().await;
            info!(%response, "companion cleanup");
        }
        Ok(())
    }

    async fn list<W: AsyncWrite + Unpin>(&mut self, for_push: bool, output: &mut W) -> Result<()> {
        let listed = self.reconciler.list(for_push).await.context("git list failed")?;
        for r in listed.refs {
            if let Some(id) = r.object_id() {
                emit(output, &HelperReply::Ref { id, name: r.name }).await?;
            }
        }
        if let Some(target) = listed.head {
            emit(output, &HelperReply::SymbolicHead(target)).await?;
        }
        Ok(())
    }

    async fn push<W: AsyncWrite + Unpin>(&mut self, specs: &[PushSpec], output: &mut W) -> Result<()> {
        for spec in specs {
            let reply = match self.reconciler.push(spec).await {
                Ok(()) => HelperReply::Ok(spec.dst.clone()),
                Err(e) => {
                    warn!(dst = %spec.dst, error = %e, "push rejected");
                    HelperReply::Error { dst: spec.dst.clone(), reason: e.to_string() }
                }
            };
            emit(output, &reply).await?;
        }
        Ok(())
    }

    async fn fetch(&mut self, requests: &[FetchRequest]) -> Result<()> {
        let report = self.reconciler.fetch(requests).await.context("git fetch failed")?;
        info!(copied = report.copied, skipped = report.skipped, "fetch completed");
        Ok(())
    }
}

/// Collect `first` and the following lines of the same kind up to the blank
/// line that closes the batch.
async fn read_batch<R, T>(
    lines: &mut Lines<R>,
    first: T,
    extract: impl Fn(HelperCommand) -> Option<T>,
) -> Result<Vec<T>>
where
    R: AsyncBufRead + Unpin,
{
    let mut batch = vec![first];
    while let Some(line) = lines.next_line().await? {
        let command = HelperCommand::parse(&line)?;
        if command == HelperCommand::Blank {
            return Ok(batch);
        }
        match extract(command) {
            Some(item) => batch.push(item),
            None => bail!("unexpected command inside batch: {line}"),
        }
    }
    Ok(batch)
}

async fn emit<W: AsyncWrite + Unpin>(output: &mut W, reply: &HelperReply) -> Result<()> {
    output.write_all(format!("{reply}\n").as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use git2::{Oid, Repository, Signature};
    use tempfile::TempDir;
    use zkgit_protocol::ControlCommand;
    use zkgit_store::GitObjectStore;
    use zkgit_sync::{DirectoryCompanion, ObjectSync, Workspace};

    const MAIN: &str = "refs/heads/main";

    type Helper = RemoteHelper<GitObjectStore, GitObjectStore, DirectoryCompanion>;

    struct Side {
        _root: TempDir,
        repo: Repository,
        helper: Helper,
    }

    fn commit(repo: &Repository, update: Option<&str>, parents: &[Oid], content: &str) -> Oid {
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let blob = repo.blob(content.as_bytes()).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("file.txt", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let parents: Vec<git2::Commit> =
            parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(update, &sig, &sig, content, &tree, &parent_refs).unwrap()
    }

    /// A local repository with its own temp root, sharing `vault` with any
    /// other side so pushes from one are visible to the other.
    fn side(vault: &Path, clean_on_exit: bool) -> Side {
        let root = TempDir::new().unwrap();
        let repo = Repository::init(root.path().join("work")).unwrap();
        repo.set_head(MAIN).unwrap();

        let workspace = Workspace::new(root.path().join("tmp"), "secret");
        let staging_dir = workspace.prepare().unwrap();
        let local = GitObjectStore::open(&root.path().join("work")).unwrap();
        let staging = GitObjectStore::open_or_init_bare(&staging_dir).unwrap();
        let channel = DirectoryCompanion::new(workspace.temp_root(), vault);
        let reconciler = Reconciler::new(local, staging, channel, workspace, ObjectSync::new(2));
        Side { _root: root, repo, helper: RemoteHelper::new(reconciler, clean_on_exit) }
    }

    async fn run(helper: &mut Helper, input: &str) -> String {
        let mut out = Vec::new();
        helper.run(input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn advertises_capabilities() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        assert_eq!(run(&mut s.helper, "capabilities\n\n").await, "push\nfetch\n\n");
    }

    #[tokio::test]
    async fn empty_remote_lists_nothing() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        assert_eq!(run(&mut s.helper, "list\n\n").await, "\n");
    }

    #[tokio::test]
    async fn first_push_then_list() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        let c1 = commit(&s.repo, Some("HEAD"), &[], "one");

        let out = run(
            &mut s.helper,
            "list for-push\npush refs/heads/main:refs/heads/main\n\nlist\n\n",
        )
        .await;
        assert_eq!(
            out,
            format!("\nok refs/heads/main\n\n{c1} refs/heads/main\n@refs/heads/main HEAD\n\n")
        );
    }

    #[tokio::test]
    async fn batch_reports_every_ref_then_one_blank_line() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        let c1 = commit(&s.repo, Some("HEAD"), &[], "one");
        s.repo.reference("refs/heads/dev", c1, true, "test").unwrap();

        let out = run(
            &mut s.helper,
            "list for-push\npush refs/heads/main:refs/heads/main\npush refs/heads/dev:refs/heads/dev\n\n\n",
        )
        .await;
        assert_eq!(out, "\nok refs/heads/main\nok refs/heads/dev\n\n");
    }

    #[tokio::test]
    async fn fast_forward_rejection_and_force() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        let c1 = commit(&s.repo, Some("HEAD"), &[], "one");
        run(&mut s.helper, "list for-push\npush refs/heads/main:refs/heads/main\n\n\n").await;

        let c2 = commit(&s.repo, Some("HEAD"), &[c1], "two");
        let out = run(&mut s.helper, "list for-push\npush refs/heads/main:refs/heads/main\n\n\n").await;
        assert_eq!(out, format!("{c1} refs/heads/main\n\nok refs/heads/main\n\n"));

        let d = commit(&s.repo, None, &[], "unrelated");
        s.repo.reference("refs/heads/other", d, true, "test").unwrap();
        let out = run(
            &mut s.helper,
            "push refs/heads/other:refs/heads/main\n\npush +refs/heads/other:refs/heads/main\n\nlist\n\n",
        )
        .await;
        assert_eq!(
            out,
            format!(
                "error refs/heads/main non-fast forward\n\nok refs/heads/main\n\n{d} refs/heads/main\n@refs/heads/main HEAD\n\n"
            )
        );
        assert_ne!(c2, d);
    }

    #[tokio::test]
    async fn deleting_a_missing_branch_is_ok() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        commit(&s.repo, Some("HEAD"), &[], "one");
        let out = run(&mut s.helper, "list for-push\npush :refs/heads/ghost\n\n\n").await;
        assert_eq!(out, "\nok refs/heads/ghost\n\n");
    }

    #[tokio::test]
    async fn clone_fetches_pushed_history() {
        let vault = TempDir::new().unwrap();
        let mut pusher = side(vault.path(), false);
        let c1 = commit(&pusher.repo, Some("HEAD"), &[], "one");
        run(&mut pusher.helper, "list for-push\npush refs/heads/main:refs/heads/main\n\n\n").await;

        let mut cloner = side(vault.path(), false);
        let out = run(
            &mut cloner.helper,
            &format!("list\nfetch {c1} refs/heads/main\n\n\n"),
        )
        .await;
        assert_eq!(out, format!("{c1} refs/heads/main\n@refs/heads/main HEAD\n\n\n"));
        assert!(cloner.repo.find_commit(c1).is_ok());
    }

    #[tokio::test]
    async fn branch_deleted_elsewhere_disappears_from_list() {
        let vault = TempDir::new().unwrap();
        let mut pusher = side(vault.path(), false);
        let c1 = commit(&pusher.repo, Some("HEAD"), &[], "one");
        pusher.repo.reference("refs/heads/dev", c1, true, "test").unwrap();
        run(
            &mut pusher.helper,
            "list for-push\npush refs/heads/main:refs/heads/main\npush refs/heads/dev:refs/heads/dev\n\n\n",
        )
        .await;

        let mut cloner = side(vault.path(), false);
        let out = run(&mut cloner.helper, "list\n\n").await;
        assert_eq!(
            out,
            format!("{c1} refs/heads/dev\n{c1} refs/heads/main\n@refs/heads/main HEAD\n\n")
        );

        let out = run(&mut pusher.helper, "list for-push\npush :refs/heads/dev\n\n\n").await;
        assert!(out.ends_with("ok refs/heads/dev\n\n"));

        let out = run(&mut cloner.helper, "list\n\n").await;
        assert_eq!(out, format!("{c1} refs/heads/main\n@refs/heads/main HEAD\n\n"));
    }

    #[tokio::test]
    async fn end_of_input_ends_session() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        assert_eq!(run(&mut s.helper, "capabilities\n").await, "push\nfetch\n\n");
    }

    #[tokio::test]
    async fn clean_on_exit_notifies_companion() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), true);
        run(&mut s.helper, "\n").await;
        let commands = s.helper.reconciler().channel().commands();
        assert_eq!(commands, vec![ControlCommand::Clean { name: "secret.tar.gz".into() }]);
    }

    #[tokio::test]
    async fn unsupported_command_is_fatal() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        let mut out = Vec::new();
        let err = s.helper.run("option verbosity 1\n".as_bytes(), &mut out).await.unwrap_err();
        assert!(err.to_string().contains("unsupported operation"));
    }

    #[tokio::test]
    async fn mixed_batch_is_fatal() {
        let vault = TempDir::new().unwrap();
        let mut s = side(vault.path(), false);
        let mut out = Vec::new();
        let input = "push refs/heads/main:refs/heads/main\nlist\n\n";
        assert!(s.helper.run(input.as_bytes(), &mut out).await.is_err());
    }
}
