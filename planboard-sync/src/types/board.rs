//! Board-level types: containers and the entries they order

use super::ids::{ContainerId, EntryId};
use crate::resolver::Axis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a container holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A board, ordering lists
    Board,
    /// A list, ordering cards
    List,
}

impl ContainerKind {
    /// The kind of entry this container orders
    pub fn child_kind(self) -> EntryKind {
        match self {
            Self::Board => EntryKind::List,
            Self::List => EntryKind::Card,
        }
    }

    /// The direction this container lays its children out in
    pub fn axis(self) -> Axis {
        match self {
            Self::Board => Axis::Horizontal,
            Self::List => Axis::Vertical,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board => f.write_str("board"),
            Self::List => f.write_str("list"),
        }
    }
}

/// What an entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A list, belonging to a board
    List,
    /// A card, belonging to a list
    Card,
}

impl EntryKind {
    /// The kind of container this entry lives in
    pub fn parent_kind(self) -> ContainerKind {
        match self {
            Self::List => ContainerKind::Board,
            Self::Card => ContainerKind::List,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Card => f.write_str("card"),
        }
    }
}

/// A container and the display order of its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub kind: ContainerKind,
    /// Child ids in display order. Unique, and exactly the entries whose
    /// parent is this container.
    #[serde(default)]
    pub order: Vec<EntryId>,
}

impl Container {
    /// Create an empty container
    pub fn new(id: impl Into<ContainerId>, kind: ContainerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            order: Vec::new(),
        }
    }

    /// Position of a child in the order array
    pub fn index_of(&self, entry: &EntryId) -> Option<usize> {
        self.order.iter().position(|id| id == entry)
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the container has no children
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A list or a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    /// The single container this entry belongs to
    pub parent: ContainerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Entry {
    /// Create an untitled entry
    pub fn new(id: impl Into<EntryId>, kind: EntryKind, parent: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent: parent.into(),
            title: None,
        }
    }

    /// Set the title payload
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
