//! Ordered container store
//!
//! The store owns every container and entry on a board. All mutation goes
//! through the methods here so that, after every call:
//!
//! - each container's order array lists exactly the entries whose parent is
//!   that container, without duplicates or foreign ids;
//! - each entry's parent reference names exactly one container, and that
//!   container's order array lists the entry.
//!
//! Because every primitive preserves these invariants, a scoped value-copy of
//! order arrays and parent references ([`ScopedSnapshot`]) is enough to undo
//! an optimistic reorder.

use crate::error::{Result, SyncError};
use crate::types::{
    Container, ContainerId, ContainerKind, Entry, EntryId, EntryKind, ReorderRequest,
    ReorderScope,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace, warn};

/// How many dropped entries are kept around for a later re-home
const DETACHED_CAPACITY: usize = 256;

/// Value-copy of the order arrays and parent references inside one
/// [`ReorderScope`], taken before an optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedSnapshot {
    scope: ReorderScope,
    containers: Vec<(ContainerId, Vec<EntryId>)>,
    parents: Vec<(EntryId, ContainerId)>,
}

impl ScopedSnapshot {
    /// The scope this snapshot covers
    pub fn scope(&self) -> &ReorderScope {
        &self.scope
    }
}

/// An entry a confirmed order dropped, with the cards of a dropped List
#[derive(Debug, Clone)]
struct Detached {
    entry: Entry,
    cards: Vec<Entry>,
}

/// In-memory board state: containers, entries and their order arrays
#[derive(Debug, Clone, Default)]
pub struct OrderedStore {
    containers: HashMap<ContainerId, Container>,
    entries: HashMap<EntryId, Entry>,
    /// Entries dropped by `replace_order`, oldest first. A cross-list move
    /// can arrive as the source list's order before the destination's.
    detached: IndexMap<EntryId, Detached>,
}

impl OrderedStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add an empty board
    pub fn add_board(&mut self, id: impl Into<ContainerId>) -> Result<()> {
        let id = id.into();
        if self.containers.contains_key(&id) {
            return Err(SyncError::duplicate_id("container", id.as_str()));
        }
        self.containers
            .insert(id.clone(), Container::new(id, ContainerKind::Board));
        Ok(())
    }

    /// Append a list to a board
    pub fn add_list(
        &mut self,
        board: impl Into<ContainerId>,
        list: impl Into<EntryId>,
        title: Option<String>,
    ) -> Result<()> {
        let mut entry = Entry::new(list, EntryKind::List, board);
        entry.title = title;
        self.insert_entry(entry, None)
    }

    /// Append a card to a list
    pub fn add_card(
        &mut self,
        list: impl Into<ContainerId>,
        card: impl Into<EntryId>,
        title: Option<String>,
    ) -> Result<()> {
        let mut entry = Entry::new(card, EntryKind::Card, list);
        entry.title = title;
        self.insert_entry(entry, None)
    }

    /// Insert an entry into its parent at `index` (clamped), or at the end.
    ///
    /// Inserting a List also creates the empty List container it designates.
    pub fn insert_entry(&mut self, entry: Entry, index: Option<usize>) -> Result<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(SyncError::duplicate_id("entry", entry.id.as_str()));
        }
        let list_container = entry.id.as_container();
        if entry.kind == EntryKind::List && self.containers.contains_key(&list_container) {
            return Err(SyncError::duplicate_id("container", list_container.as_str()));
        }
        let parent = self.container(&entry.parent)?;
        check_kind(entry.kind, parent)?;

        self.detached.shift_remove(&entry.id);

        let parent = self.container_mut(&entry.parent)?;
        let index = index.unwrap_or(parent.len()).min(parent.len());
        parent.order.insert(index, entry.id.clone());

        if entry.kind == EntryKind::List {
            self.containers.insert(
                list_container.clone(),
                Container::new(list_container, ContainerKind::List),
            );
        }
        trace!(entry = %entry.id, parent = %entry.parent, index, "inserted entry");
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Remove an entry. Removing a List also removes its container and cards.
    ///
    /// Returns the containers whose order arrays changed.
    pub fn remove_entry(&mut self, id: &EntryId) -> Result<Vec<ContainerId>> {
        let parent = self.entry(id)?.parent.clone();
        if let Some(container) = self.containers.get_mut(&parent) {
            container.order.retain(|child| child != id);
        }
        let mut touched = vec![parent];
        touched.extend(self.drop_entry_tree(id, false));
        debug!(entry = %id, "removed entry");
        Ok(touched)
    }

    /// Forget an entry and, for Lists, everything below it. Does not touch
    /// the parent's order array. With `keep` the removed entries are stashed
    /// so a later confirmed order naming the entry can bring them back.
    ///
    /// Returns the List container that went away, if any.
    fn drop_entry_tree(&mut self, id: &EntryId, keep: bool) -> Option<ContainerId> {
        let entry = self.entries.remove(id)?;
        let mut cards = Vec::new();
        let mut dropped = None;
        if entry.kind == EntryKind::List {
            if let Some(container) = self.containers.remove(&id.as_container()) {
                cards = container
                    .order
                    .iter()
                    .filter_map(|card| self.entries.remove(card))
                    .collect();
                dropped = Some(container.id);
            }
        }

        if keep {
            if self.detached.len() >= DETACHED_CAPACITY {
                self.detached.shift_remove_index(0);
            }
            self.detached.insert(id.clone(), Detached { entry, cards });
        }
        dropped
    }

    /// Create an entry a confirmed order names but the store does not hold.
    ///
    /// An entry dropped earlier by another confirmed order comes back with
    /// its fields, and a List with the cards it had. Returns the List
    /// container created, if any.
    fn attach(
        &mut self,
        id: &EntryId,
        kind: EntryKind,
        parent: &ContainerId,
    ) -> Option<ContainerId> {
        let (mut entry, cards) = match self.detached.shift_remove(id) {
            Some(stashed) if stashed.entry.kind == kind => {
                debug!(entry = %id, %parent, "re-homing dropped entry");
                (stashed.entry, stashed.cards)
            }
            _ => (Entry::new(id.clone(), kind, parent.clone()), Vec::new()),
        };
        entry.parent = parent.clone();
        self.entries.insert(id.clone(), entry);

        let list = id.as_container();
        if kind != EntryKind::List || self.containers.contains_key(&list) {
            return None;
        }
        let mut container = Container::new(list.clone(), ContainerKind::List);
        for card in cards {
            // Already re-created on its own
            if self.entries.contains_key(&card.id) {
                continue;
            }
            container.order.push(card.id.clone());
            self.entries.insert(card.id.clone(), card);
        }
        self.containers.insert(list.clone(), container);
        Some(list)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Look up a container
    pub fn container(&self, id: &ContainerId) -> Result<&Container> {
        self.containers
            .get(id)
            .ok_or_else(|| SyncError::ContainerNotFound { id: id.clone() })
    }

    fn container_mut(&mut self, id: &ContainerId) -> Result<&mut Container> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| SyncError::ContainerNotFound { id: id.clone() })
    }

    /// Look up an entry
    pub fn entry(&self, id: &EntryId) -> Result<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| SyncError::EntryNotFound { id: id.clone() })
    }

    /// Check whether an entry exists
    pub fn contains_entry(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Check whether a container exists
    pub fn contains_container(&self, id: &ContainerId) -> bool {
        self.containers.contains_key(id)
    }

    /// Order array of a container
    pub fn order(&self, id: &ContainerId) -> Result<&[EntryId]> {
        Ok(self.container(id)?.order.as_slice())
    }

    /// Parent of an entry, if the entry exists
    pub fn parent_of(&self, id: &EntryId) -> Option<&ContainerId> {
        self.entries.get(id).map(|entry| &entry.parent)
    }

    /// Position of an entry inside its parent
    pub fn index_of(&self, id: &EntryId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.containers.get(parent)?.index_of(id)
    }

    /// All containers, in no particular order
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// All entries, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    // =========================================================================
    // Mutation primitives
    // =========================================================================

    /// Move `entry` to `new_index` inside `container`.
    ///
    /// The index is clamped to `[0, len]` measured after removing the entry.
    /// Returns the index the entry landed at.
    pub fn reorder_within(
        &mut self,
        container: &ContainerId,
        entry: &EntryId,
        new_index: usize,
    ) -> Result<usize> {
        let target = self.container_mut(container)?;
        let current = target
            .index_of(entry)
            .ok_or_else(|| SyncError::not_in_container(entry, container))?;
        let id = target.order.remove(current);
        let index = new_index.min(target.len());
        target.order.insert(index, id);
        trace!(%entry, %container, from = current, to = index, "reordered within");
        Ok(index)
    }

    /// Move `entry` from `source` to `new_index` of `dest`, reparenting it.
    ///
    /// The index is clamped to `[0, dest_len]`. When source and destination
    /// are the same container this is [`OrderedStore::reorder_within`].
    /// Nothing is mutated unless the whole move is valid.
    pub fn move_across(
        &mut self,
        entry: &EntryId,
        source: &ContainerId,
        dest: &ContainerId,
        new_index: usize,
    ) -> Result<usize> {
        if source == dest {
            return self.reorder_within(source, entry, new_index);
        }

        let current = self
            .container(source)?
            .index_of(entry)
            .ok_or_else(|| SyncError::not_in_container(entry, source))?;
        let kind = self.entry(entry)?.kind;
        check_kind(kind, self.container(dest)?)?;

        self.container_mut(source)?.order.remove(current);
        let target = self.container_mut(dest)?;
        let index = new_index.min(target.len());
        target.order.insert(index, entry.clone());
        if let Some(moved) = self.entries.get_mut(entry) {
            moved.parent = dest.clone();
        }
        trace!(%entry, %source, %dest, to = index, "moved across");
        Ok(index)
    }

    /// Apply a reorder request with the matching primitive
    pub fn apply(&mut self, request: &ReorderRequest) -> Result<usize> {
        if request.is_within() {
            self.reorder_within(&request.source, &request.entry, request.index)
        } else {
            self.move_across(&request.entry, &request.source, &request.dest, request.index)
        }
    }

    /// Replace a container's order array with an externally confirmed one.
    ///
    /// Ids that currently live in another container are reparented here. Ids
    /// the store does not hold are created with the container's child kind,
    /// or brought back with their fields if an earlier confirmed order
    /// dropped them. Previous children missing from `order` are dropped and
    /// stashed: the order naming their new home may still be on its way.
    /// Returns every container whose order array changed.
    pub fn replace_order(
        &mut self,
        container: &ContainerId,
        order: Vec<EntryId>,
    ) -> Result<Vec<ContainerId>> {
        let child_kind = self.container(container)?.kind.child_kind();

        let mut seen = HashSet::with_capacity(order.len());
        for id in &order {
            if !seen.insert(id) {
                return Err(SyncError::duplicate_id("entry", id.as_str()));
            }
            if let Some(existing) = self.entries.get(id) {
                if existing.kind != child_kind {
                    let target = self.container(container)?;
                    return Err(SyncError::KindMismatch {
                        entry_kind: existing.kind,
                        container_kind: target.kind,
                        container: container.clone(),
                    });
                }
            }
            if child_kind == EntryKind::List && &id.as_container() == container {
                return Err(SyncError::invariant(format!(
                    "list '{id}' cannot contain itself"
                )));
            }
        }

        let mut touched = BTreeSet::new();
        touched.insert(container.clone());
        let previous = std::mem::take(&mut self.container_mut(container)?.order);

        for id in &order {
            match self.entries.get_mut(id) {
                Some(entry) if &entry.parent != container => {
                    let old_parent = std::mem::replace(&mut entry.parent, container.clone());
                    if let Some(old) = self.containers.get_mut(&old_parent) {
                        old.order.retain(|child| child != id);
                    }
                    touched.insert(old_parent);
                }
                Some(_) => {}
                None => {
                    if let Some(list) = self.attach(id, child_kind, container) {
                        touched.insert(list);
                    }
                }
            }
        }

        for id in previous.iter().filter(|id| !seen.contains(id)) {
            debug!(entry = %id, %container, "entry dropped by confirmed order, detaching");
            if let Some(dropped) = self.drop_entry_tree(id, true) {
                touched.insert(dropped);
            }
        }

        self.container_mut(container)?.order = order;
        Ok(touched.into_iter().collect())
    }

    // =========================================================================
    // Snapshot / restore
    // =========================================================================

    /// Capture the order arrays of the scoped containers and the parent
    /// references of every entry they list.
    pub fn snapshot(&self, scope: &ReorderScope) -> Result<ScopedSnapshot> {
        self.entry(&scope.entry)?;
        let mut containers = Vec::with_capacity(2);
        let mut parents = Vec::new();
        for id in scope.containers() {
            let container = self.container(&id)?;
            for child in &container.order {
                parents.push((child.clone(), id.clone()));
            }
            containers.push((id, container.order.clone()));
        }
        Ok(ScopedSnapshot {
            scope: scope.clone(),
            containers,
            parents,
        })
    }

    /// Put the scoped containers and entries back as captured.
    ///
    /// Exact when nothing outside the engine touched the scope in between.
    /// Otherwise best-effort: entries deleted since are not resurrected, a
    /// container deleted since is skipped, and entries that arrived in a
    /// scoped container since stay, after the restored order. Returns the
    /// containers whose order arrays changed.
    pub fn restore(&mut self, snapshot: &ScopedSnapshot) -> Vec<ContainerId> {
        let mut touched = BTreeSet::new();

        // Detach every captured entry from wherever it lives now, unless its
        // captured container is gone and there is nowhere to put it back.
        for (id, captured_parent) in &snapshot.parents {
            if !self.containers.contains_key(captured_parent) {
                continue;
            }
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if let Some(current) = self.containers.get_mut(&entry.parent) {
                current.order.retain(|child| child != id);
                touched.insert(current.id.clone());
            }
        }

        for (container_id, captured) in &snapshot.containers {
            let Some(container) = self.containers.get_mut(container_id) else {
                warn!(container = %container_id, "scoped container vanished, skipping restore");
                continue;
            };
            let arrivals = std::mem::take(&mut container.order);
            let mut restored: Vec<EntryId> = captured
                .iter()
                .filter(|id| self.entries.contains_key(*id))
                .cloned()
                .collect();
            for id in &restored {
                if let Some(entry) = self.entries.get_mut(id) {
                    entry.parent = container_id.clone();
                }
            }
            restored.extend(arrivals);
            container.order = restored;
            touched.insert(container_id.clone());
        }

        debug!(entry = %snapshot.scope.entry, "restored scoped snapshot");
        touched.into_iter().collect()
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Verify order arrays and parent references agree everywhere
    pub fn check_invariants(&self) -> Result<()> {
        let mut listed = HashSet::with_capacity(self.entries.len());
        for container in self.containers.values() {
            for id in &container.order {
                if !listed.insert(id) {
                    return Err(SyncError::invariant(format!(
                        "entry '{id}' is listed more than once"
                    )));
                }
                let entry = self.entries.get(id).ok_or_else(|| {
                    SyncError::invariant(format!(
                        "container '{}' lists unknown entry '{id}'",
                        container.id
                    ))
                })?;
                if entry.parent != container.id {
                    return Err(SyncError::invariant(format!(
                        "container '{}' lists '{id}' whose parent is '{}'",
                        container.id, entry.parent
                    )));
                }
                if entry.kind != container.kind.child_kind() {
                    return Err(SyncError::invariant(format!(
                        "{} '{id}' listed in {} '{}'",
                        entry.kind, container.kind, container.id
                    )));
                }
            }
        }

        for entry in self.entries.values() {
            if !listed.contains(&entry.id) {
                return Err(SyncError::invariant(format!(
                    "entry '{}' is not listed by its parent '{}'",
                    entry.id, entry.parent
                )));
            }
            if entry.kind == EntryKind::List
                && !self.containers.contains_key(&entry.id.as_container())
            {
                return Err(SyncError::invariant(format!(
                    "list '{}' has no container",
                    entry.id
                )));
            }
        }

        for container in self.containers.values() {
            if container.kind == ContainerKind::List
                && !self.entries.contains_key(&container.id.as_entry())
            {
                return Err(SyncError::invariant(format!(
                    "list container '{}' has no entry",
                    container.id
                )));
            }
        }
        Ok(())
    }
}

fn check_kind(kind: EntryKind, container: &Container) -> Result<()> {
    if container.kind.child_kind() == kind {
        Ok(())
    } else {
        Err(SyncError::KindMismatch {
            entry_kind: kind,
            container_kind: container.kind,
            container: container.id.clone(),
        })
    }
}
