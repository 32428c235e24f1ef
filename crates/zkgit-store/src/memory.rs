//! In-memory object store for tests.
//!
//! [`InMemoryObjectStore`] keeps a commit graph (id → parents) and a ref
//! table behind `RwLock`s. It implements the full [`ObjectStore`] trait, so
//! ref-writing and signature logic can be exercised without touching git.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use zkgit_types::{ObjectId, Ref, RefTarget};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectStore, RefUpdateOutcome};

/// An in-memory implementation of [`ObjectStore`].
///
/// Loose objects are not modelled; `objects_dir` returns whatever directory
/// the store was built with so object copying can still be pointed at it.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects_dir: PathBuf,
    commits: RwLock<HashMap<ObjectId, Vec<ObjectId>>>,
    refs: RwLock<BTreeMap<String, RefTarget>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl InMemoryObjectStore {
    /// Create an empty store whose objects live under `objects_dir`.
    pub fn new(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            commits: RwLock::new(HashMap::new()),
            refs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record a commit and its parents.
    pub fn add_commit(&self, id: ObjectId, parents: &[ObjectId]) -> StoreResult<()> {
        self.commits.write().map_err(poisoned)?.insert(id, parents.to_vec());
        Ok(())
    }

    /// Set a ref without any fast-forward checks.
    pub fn set_ref(&self, name: &str, target: RefTarget) -> StoreResult<()> {
        self.refs.write().map_err(poisoned)?.insert(name.to_string(), target);
        Ok(())
    }

    fn peel(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        let refs = self.refs.read().map_err(poisoned)?;
        let mut current = name.to_string();
        // Symbolic chains are short; the bound only guards against cycles.
        for _ in 0..8 {
            match refs.get(&current) {
                Some(RefTarget::Direct(id)) => return Ok(Some(*id)),
                Some(RefTarget::Symbolic(next)) => current = next.clone(),
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    fn history(&self, tip: ObjectId) -> StoreResult<Vec<ObjectId>> {
        let commits = self.commits.read().map_err(poisoned)?;
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([tip]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(parents) = commits.get(&id) {
                queue.extend(parents.iter().copied());
            }
        }
        Ok(order)
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn objects_dir(&self) -> PathBuf {
        self.objects_dir.clone()
    }

    fn resolve(&self, spec: &str) -> StoreResult<Option<ObjectId>> {
        if let Some(id) = self.peel(spec)? {
            return Ok(Some(id));
        }
        match ObjectId::from_hex(spec) {
            Ok(id) if self.commits.read().map_err(poisoned)?.contains_key(&id) => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> StoreResult<bool> {
        Ok(self.history(*descendant)?.contains(ancestor))
    }

    fn read_symbolic_ref(&self, name: &str) -> StoreResult<Option<String>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(match refs.get(name) {
            Some(RefTarget::Symbolic(target)) => Some(target.clone()),
            _ => None,
        })
    }

    fn list_branches(&self) -> StoreResult<Vec<Ref>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .iter()
            .filter(|(name, _)| name.starts_with("refs/heads/"))
            .filter_map(|(name, target)| match target {
                RefTarget::Direct(id) => Some(Ref::direct(name.clone(), *id)),
                RefTarget::Symbolic(_) => None,
            })
            .collect())
    }

    fn update_ref(
        &self,
        name: &str,
        new_id: &ObjectId,
        force: bool,
    ) -> StoreResult<RefUpdateOutcome> {
        let outcome = match self.peel(name)? {
            None => RefUpdateOutcome::New,
            Some(old) if old == *new_id => return Ok(RefUpdateOutcome::NoChange),
            Some(old) if self.is_ancestor(&old, new_id)? => RefUpdateOutcome::FastForward,
            Some(_) if force => RefUpdateOutcome::Forced,
            Some(_) => return Ok(RefUpdateOutcome::Rejected),
        };
        self.set_ref(name, RefTarget::Direct(*new_id))?;
        Ok(outcome)
    }

    fn link_symbolic_ref(&self, name: &str, target: &str) -> StoreResult<RefUpdateOutcome> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        let previous = refs.insert(name.to_string(), RefTarget::Symbolic(target.to_string()));
        Ok(match previous {
            None => RefUpdateOutcome::New,
            Some(RefTarget::Symbolic(old)) if old == target => RefUpdateOutcome::NoChange,
            Some(_) => RefUpdateOutcome::Forced,
        })
    }

    fn delete_branch(&self, name: &str, _force: bool) -> StoreResult<bool> {
        Ok(self.refs.write().map_err(poisoned)?.remove(name).is_some())
    }

    fn walk_reachable_commits(&self, start: &str) -> StoreResult<Vec<ObjectId>> {
        match self.resolve(start)? {
            Some(tip) => self.history(tip),
            None => Ok(Vec::new()),
        }
    }
}
