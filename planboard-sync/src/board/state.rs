//! Everything behind the shared board lock

use crate::drag::GrabGuard;
use crate::error::{Result, SyncError};
use crate::ingest::IngestOutcome;
use crate::store::{OrderedStore, ScopedSnapshot};
use crate::types::{ContainerId, EntryId, LiveUpdate, ReorderId, ReorderRequest};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// An optimistic reorder waiting for the remote to answer
#[derive(Debug, Clone)]
pub struct PendingReorder {
    pub id: ReorderId,
    pub request: ReorderRequest,
    pub snapshot: ScopedSnapshot,
}

/// Containers and entries the CRUD layer has marked as busy (mid-delete,
/// mid-update). Busy items cannot be grabbed.
#[derive(Debug, Clone, Default)]
pub struct DisabledFlags {
    containers: HashSet<ContainerId>,
    entries: HashSet<EntryId>,
}

impl DisabledFlags {
    /// Mark or unmark a container
    pub fn set_container(&mut self, id: ContainerId, disabled: bool) {
        if disabled {
            self.containers.insert(id);
        } else {
            self.containers.remove(&id);
        }
    }

    /// Mark or unmark an entry
    pub fn set_entry(&mut self, id: EntryId, disabled: bool) {
        if disabled {
            self.entries.insert(id);
        } else {
            self.entries.remove(&id);
        }
    }

    /// Check a container
    pub fn container(&self, id: &ContainerId) -> bool {
        self.containers.contains(id)
    }

    /// Check an entry
    pub fn entry(&self, id: &EntryId) -> bool {
        self.entries.contains(id)
    }
}

/// The store plus the bookkeeping that keeps local and remote mutation apart
#[derive(Debug, Default)]
pub struct BoardState {
    store: OrderedStore,
    /// In-flight reorders, in the order they began
    pending: IndexMap<EntryId, PendingReorder>,
    /// At most one update per container, in arrival order of the newest
    buffered: Vec<LiveUpdate>,
    disabled: DisabledFlags,
}

impl BoardState {
    /// Wrap a store
    pub fn new(store: OrderedStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Read access to the store
    pub fn store(&self) -> &OrderedStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut OrderedStore {
        &mut self.store
    }

    /// Disabled-state flags
    pub fn disabled(&self) -> &DisabledFlags {
        &self.disabled
    }

    pub(crate) fn disabled_mut(&mut self) -> &mut DisabledFlags {
        &mut self.disabled
    }

    // =========================================================================
    // Pending reorders
    // =========================================================================

    /// Check if an entry has a reorder in flight
    pub fn is_pending(&self, entry: &EntryId) -> bool {
        self.pending.contains_key(entry)
    }

    /// Number of reorders in flight
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Register an in-flight reorder. At most one per entry.
    pub(crate) fn begin_reorder(&mut self, pending: PendingReorder) -> Result<()> {
        let entry = pending.request.entry.clone();
        if self.pending.contains_key(&entry) {
            return Err(SyncError::ReorderPending { entry });
        }
        self.pending.insert(entry, pending);
        Ok(())
    }

    /// Remove and return the in-flight reorder of an entry, with its position
    /// in begin order
    pub(crate) fn finish_reorder(
        &mut self,
        entry: &EntryId,
    ) -> Option<(usize, PendingReorder)> {
        self.pending
            .shift_remove_full(entry)
            .map(|(position, _, pending)| (position, pending))
    }

    /// Undo a finished reorder that began at `position`.
    ///
    /// Restoring its snapshot also rewinds any reorder that began later in
    /// the same containers, so those are re-applied on top, oldest first,
    /// each with a fresh snapshot of the state it now sits on. Returns every
    /// container whose order array changed.
    pub(crate) fn roll_back(
        &mut self,
        position: usize,
        finished: &PendingReorder,
    ) -> Vec<ContainerId> {
        let mut touched: BTreeSet<ContainerId> =
            self.store.restore(&finished.snapshot).into_iter().collect();

        for later in self.pending.values_mut().skip(position) {
            let scope = later.request.scope();
            if !scope.containers().iter().any(|id| touched.contains(id)) {
                continue;
            }
            let snapshot = match self.store.snapshot(&scope) {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    warn!(entry = %scope.entry, %error, "cannot replay in-flight reorder");
                    continue;
                }
            };
            match self.store.apply(&later.request) {
                Ok(index) => {
                    debug!(entry = %scope.entry, index, "replayed in-flight reorder");
                    later.snapshot = snapshot;
                    touched.extend(scope.containers());
                }
                Err(error) => {
                    warn!(entry = %scope.entry, %error, "cannot replay in-flight reorder")
                }
            }
        }
        touched.into_iter().collect()
    }

    /// Check if applying `update` could interfere with an in-flight reorder.
    ///
    /// It does when it targets a scoped container, moves the scoped entry,
    /// or lists (now or after applying) anything in scope: the moved entry, a
    /// scoped List, or an entry currently living in a scoped container.
    pub fn touches_pending(&self, update: &LiveUpdate) -> bool {
        let target = update.container();
        let current = self.store.order(target).unwrap_or(&[]);
        self.pending.values().any(|pending| {
            let scope = pending.snapshot.scope();
            scope.contains_container(target)
                || update.moved_entry() == Some(&scope.entry)
                || current
                    .iter()
                    .chain(update.order())
                    .any(|id| {
                        scope.contains_entry(id)
                            || self
                                .store
                                .parent_of(id)
                                .is_some_and(|parent| scope.contains_container(parent))
                    })
        })
    }

    // =========================================================================
    // Buffered remote updates
    // =========================================================================

    /// Hold an update until the reorders it touches resolve. A newer update
    /// for the same container replaces the held one.
    pub(crate) fn buffer(&mut self, update: LiveUpdate) -> IngestOutcome {
        let before = self.buffered.len();
        self.buffered
            .retain(|held| held.container() != update.container());
        let outcome = if self.buffered.len() < before {
            IngestOutcome::Superseded
        } else {
            IngestOutcome::Buffered
        };
        self.buffered.push(update);
        outcome
    }

    /// Number of held updates
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Take the held updates no in-flight reorder touches any more
    pub(crate) fn take_ready(&mut self) -> Vec<LiveUpdate> {
        let held = std::mem::take(&mut self.buffered);
        let (ready, still_held): (Vec<_>, Vec<_>) =
            held.into_iter().partition(|update| !self.touches_pending(update));
        self.buffered = still_held;
        ready
    }
}

impl GrabGuard for BoardState {
    fn is_entry_locked(&self, entry: &EntryId) -> bool {
        self.is_pending(entry) || self.disabled.entry(entry)
    }

    fn is_container_disabled(&self, container: &ContainerId) -> bool {
        self.disabled.container(container)
    }
}
