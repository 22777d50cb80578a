//! Values that cross the engine boundary: reorder requests, live updates
//! from collaborators and authoritative payloads from the backend.

use super::ids::{ContainerId, EntryId};
use serde::{Deserialize, Serialize};

/// A request to move `entry` from `source` to position `index` of `dest`.
///
/// `index` is expressed against the destination's order array after the
/// entry has been removed from its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub entry: EntryId,
    pub source: ContainerId,
    pub dest: ContainerId,
    pub index: usize,
}

impl ReorderRequest {
    /// Create a new request
    pub fn new(
        entry: impl Into<EntryId>,
        source: impl Into<ContainerId>,
        dest: impl Into<ContainerId>,
        index: usize,
    ) -> Self {
        Self {
            entry: entry.into(),
            source: source.into(),
            dest: dest.into(),
            index,
        }
    }

    /// Create a request that reorders within a single container
    pub fn within(entry: impl Into<EntryId>, container: impl Into<ContainerId>, index: usize) -> Self {
        let container = container.into();
        Self {
            entry: entry.into(),
            source: container.clone(),
            dest: container,
            index,
        }
    }

    /// Check if source and destination are the same container
    pub fn is_within(&self) -> bool {
        self.source == self.dest
    }

    /// The containers and entry this request can touch
    pub fn scope(&self) -> ReorderScope {
        ReorderScope {
            entry: self.entry.clone(),
            source: self.source.clone(),
            dest: self.dest.clone(),
        }
    }
}

/// The part of the board one reorder touches: its source container,
/// destination container and moved entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderScope {
    pub entry: EntryId,
    pub source: ContainerId,
    pub dest: ContainerId,
}

impl ReorderScope {
    /// Distinct containers in scope, source first
    pub fn containers(&self) -> Vec<ContainerId> {
        if self.source == self.dest {
            vec![self.source.clone()]
        } else {
            vec![self.source.clone(), self.dest.clone()]
        }
    }

    /// Check if a container is in scope
    pub fn contains_container(&self, id: &ContainerId) -> bool {
        &self.source == id || &self.dest == id
    }

    /// Check if an id listed in some order array refers to something in scope:
    /// the moved entry itself, or a List whose container is in scope.
    pub fn contains_entry(&self, id: &EntryId) -> bool {
        &self.entry == id || self.contains_container(&id.as_container())
    }
}

/// An order change broadcast by another collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveUpdate {
    /// A container's order array was replaced
    ContainerOrder {
        container: ContainerId,
        order: Vec<EntryId>,
    },
    /// An entry moved to `new_parent`, whose order array is now `order`
    EntryMoved {
        entry: EntryId,
        new_parent: ContainerId,
        order: Vec<EntryId>,
    },
}

impl LiveUpdate {
    /// The container whose order array this update replaces
    pub fn container(&self) -> &ContainerId {
        match self {
            Self::ContainerOrder { container, .. } => container,
            Self::EntryMoved { new_parent, .. } => new_parent,
        }
    }

    /// The incoming order array
    pub fn order(&self) -> &[EntryId] {
        match self {
            Self::ContainerOrder { order, .. } => order,
            Self::EntryMoved { order, .. } => order,
        }
    }

    /// The moved entry, for cross-container moves
    pub fn moved_entry(&self) -> Option<&EntryId> {
        match self {
            Self::ContainerOrder { .. } => None,
            Self::EntryMoved { entry, .. } => Some(entry),
        }
    }
}

/// Order of one container as confirmed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    pub id: ContainerId,
    pub order: Vec<EntryId>,
}

impl ContainerState {
    /// Create a container state
    pub fn new<I, E>(id: impl Into<ContainerId>, order: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EntryId>,
    {
        Self {
            id: id.into(),
            order: order.into_iter().map(Into::into).collect(),
        }
    }
}

/// Authoritative state of the containers affected by a reorder, optionally
/// returned by the mutation channel on success
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeState {
    #[serde(default)]
    pub containers: Vec<ContainerState>,
}

impl AuthoritativeState {
    /// Create a payload from container states
    pub fn new(containers: Vec<ContainerState>) -> Self {
        Self { containers }
    }

    /// Add a container state
    pub fn with_container(mut self, state: ContainerState) -> Self {
        self.containers.push(state);
        self
    }

    /// Check if the payload carries no containers
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
