//! Per-process session state and fast-forward-safe ref writes.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use zkgit_store::{ObjectStore, RefUpdateOutcome};
use zkgit_types::ObjectId;

use crate::error::{SyncError, SyncResult};

/// State that lives for one helper invocation.
#[derive(Debug, Default)]
pub struct Session {
    /// Refs written this session and the value they were written with.
    refs: HashMap<String, ObjectId>,
    /// Successful pushes: destination ref to resulting commit.
    pushed: BTreeMap<String, ObjectId>,
    first_push: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_first_push(&self) -> bool {
        self.first_push
    }

    pub fn mark_first_push(&mut self) {
        self.first_push = true;
    }

    pub fn clear_first_push(&mut self) {
        self.first_push = false;
    }

    /// Value recorded for `name` by an earlier write this session.
    pub fn known(&self, name: &str) -> Option<ObjectId> {
        self.refs.get(name).copied()
    }

    pub fn pushed(&self) -> &BTreeMap<String, ObjectId> {
        &self.pushed
    }

    /// Drop everything recorded for `name` (after a delete).
    pub fn forget(&mut self, name: &str) {
        self.refs.remove(name);
        self.pushed.remove(name);
    }

    /// Point `name` at `id` in `store` without losing history.
    ///
    /// With a value recorded earlier this session, moving to an ancestor of
    /// that value is a no-op and anything that is not a fast-forward needs
    /// `force`. Without one, the store's own update decides.
    pub fn write_ref<S>(
        &mut self,
        store: &S,
        id: ObjectId,
        name: &str,
        force: bool,
    ) -> SyncResult<RefUpdateOutcome>
    where
        S: ObjectStore + ?Sized,
    {
        let outcome = match self.known(name) {
            Some(prior) => {
                if store.is_ancestor(&id, &prior)? {
                    debug!(name, id = %id.short_hex(), "ref already contains commit");
                    RefUpdateOutcome::NoChange
                } else if !force && !store.is_ancestor(&prior, &id)? {
                    return Err(SyncError::NonFastForward { name: name.to_string() });
                } else {
                    let outcome = store.update_ref(name, &id, true)?;
                    self.record(name, id, outcome, true)?;
                    outcome
                }
            }
            None => {
                let outcome = store.update_ref(name, &id, force)?;
                self.record(name, id, outcome, force)?;
                outcome
            }
        };
        self.pushed.insert(name.to_string(), id);
        Ok(outcome)
    }

    fn record(
        &mut self,
        name: &str,
        id: ObjectId,
        outcome: RefUpdateOutcome,
        force: bool,
    ) -> SyncResult<()> {
        if outcome.is_success() {
            debug!(name, id = %id.short_hex(), %outcome, "ref written");
            self.refs.insert(name.to_string(), id);
            Ok(())
        } else if !force {
            Err(SyncError::NonFastForward { name: name.to_string() })
        } else {
            Err(SyncError::CannotWriteRef { name: name.to_string(), outcome })
        }
    }
}
