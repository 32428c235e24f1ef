//! On-disk repository backend built on `git2`.

use std::path::{Path, PathBuf};

use git2::{ErrorCode, Oid, Repository};
use tracing::debug;
use zkgit_types::{ObjectId, Ref};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectStore, RefUpdateOutcome};

const REFLOG_MESSAGE: &str = "zkgit: update by remote helper";

/// An [`ObjectStore`] over a repository on disk.
pub struct GitObjectStore {
    repo: Repository,
    git_dir: PathBuf,
}

impl GitObjectStore {
    /// Open the repository at `path` (a work tree or a git dir).
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::from_repo(Repository::open(path)?))
    }

    /// Search upwards from `path` for a repository.
    pub fn discover(path: &Path) -> StoreResult<Self> {
        Ok(Self::from_repo(Repository::discover(path)?))
    }

    /// Open the bare repository at `path`, creating it first if needed.
    pub fn open_or_init_bare(path: &Path) -> StoreResult<Self> {
        let repo = match Repository::open_bare(path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!(path = %path.display(), "initializing bare repository");
                Repository::init_bare(path)?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_repo(repo))
    }

    fn from_repo(repo: Repository) -> Self {
        let git_dir = repo.path().to_path_buf();
        Self { repo, git_dir }
    }

    /// The repository's git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Direct access to the underlying repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

fn to_oid(id: &ObjectId) -> StoreResult<Oid> {
    Ok(Oid::from_bytes(id.as_bytes())?)
}

fn from_oid(oid: Oid) -> StoreResult<ObjectId> {
    Ok(ObjectId::from_slice(oid.as_bytes())?)
}

fn is_missing(e: &git2::Error) -> bool {
    matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::UnbornBranch)
}

impl ObjectStore for GitObjectStore {
    fn objects_dir(&self) -> PathBuf {
        self.git_dir.join("objects")
    }

    fn resolve(&self, spec: &str) -> StoreResult<Option<ObjectId>> {
        match self.repo.revparse_single(spec) {
            Ok(obj) => Ok(Some(from_oid(obj.id())?)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> StoreResult<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self
            .repo
            .graph_descendant_of(to_oid(descendant)?, to_oid(ancestor)?)?)
    }

    fn read_symbolic_ref(&self, name: &str) -> StoreResult<Option<String>> {
        match self.repo.find_reference(name) {
            Ok(reference) => Ok(reference.symbolic_target().map(str::to_string)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_branches(&self) -> StoreResult<Vec<Ref>> {
        let mut branches = Vec::new();
        for reference in self.repo.references_glob("refs/heads/*")? {
            let reference = reference?;
            let (Some(name), Some(target)) = (reference.name(), reference.target()) else {
                continue;
            };
            branches.push(Ref::direct(name, from_oid(target)?));
        }
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    fn update_ref(
        &self,
        name: &str,
        new_id: &ObjectId,
        force: bool,
    ) -> StoreResult<RefUpdateOutcome> {
        let current = match self.repo.find_reference(name) {
            Ok(reference) => reference.target(),
            Err(e) if is_missing(&e) => None,
            Err(e) => return Err(e.into()),
        };

        let outcome = match current {
            None => RefUpdateOutcome::New,
            Some(old) => {
                let old = from_oid(old)?;
                if old == *new_id {
                    return Ok(RefUpdateOutcome::NoChange);
                }
                if self.is_ancestor(&old, new_id)? {
                    RefUpdateOutcome::FastForward
                } else if force {
                    RefUpdateOutcome::Forced
                } else {
                    return Ok(RefUpdateOutcome::Rejected);
                }
            }
        };

        self.repo
            .reference(name, to_oid(new_id)?, true, REFLOG_MESSAGE)
            .map_err(|e| StoreError::RefWrite {
                name: name.to_string(),
                reason: e.message().to_string(),
            })?;
        debug!(name, id = %new_id.short_hex(), %outcome, "ref updated");
        Ok(outcome)
    }

    fn link_symbolic_ref(&self, name: &str, target: &str) -> StoreResult<RefUpdateOutcome> {
        let existed = match self.repo.find_reference(name) {
            Ok(reference) => {
                if reference.symbolic_target() == Some(target) {
                    return Ok(RefUpdateOutcome::NoChange);
                }
                true
            }
            Err(e) if is_missing(&e) => false,
            Err(e) => return Err(e.into()),
        };
        self.repo
            .reference_symbolic(name, target, true, REFLOG_MESSAGE)
            .map_err(|e| StoreError::RefWrite {
                name: name.to_string(),
                reason: e.message().to_string(),
            })?;
        Ok(if existed { RefUpdateOutcome::Forced } else { RefUpdateOutcome::New })
    }

    fn delete_branch(&self, name: &str, _force: bool) -> StoreResult<bool> {
        match self.repo.find_reference(name) {
            Ok(mut reference) => {
                reference.delete()?;
                debug!(name, "branch deleted");
                Ok(true)
            }
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn walk_reachable_commits(&self, start: &str) -> StoreResult<Vec<ObjectId>> {
        let Some(tip) = self.resolve(start)? else {
            return Ok(Vec::new());
        };
        let mut walk = self.repo.revwalk()?;
        walk.push(to_oid(&tip)?)?;
        walk.map(|oid| from_oid(oid?)).collect()
    }

    fn refresh(&mut self) -> StoreResult<()> {
        self.repo = Repository::open(&self.git_dir)?;
        Ok(())
    }
}
