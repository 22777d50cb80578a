//! Error types for the synchronization engine

use crate::types::{ContainerId, ContainerKind, EntryId, EntryKind};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while reordering, reconciling or ingesting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The entry is not listed in the container's order array.
    ///
    /// Store-level: this indicates model corruption or a caller bug and is
    /// never shown to a user.
    #[error("entry '{entry}' is not in container '{container}'")]
    EntryNotInContainer {
        entry: EntryId,
        container: ContainerId,
    },

    /// Container not found
    #[error("container not found: {id}")]
    ContainerNotFound { id: ContainerId },

    /// Entry not found
    #[error("entry not found: {id}")]
    EntryNotFound { id: EntryId },

    /// Duplicate ID
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// Entry kind does not belong in the container kind
    #[error("a {entry_kind} cannot be placed in a {container_kind} ('{container}')")]
    KindMismatch {
        entry_kind: EntryKind,
        container_kind: ContainerKind,
        container: ContainerId,
    },

    /// A reorder of this entry is already in flight
    #[error("a reorder of entry '{entry}' is already pending")]
    ReorderPending { entry: EntryId },

    /// The mutation channel resolved with a rejection
    #[error("remote rejected reorder: {reason}")]
    RemoteRejected { reason: String },

    /// The mutation channel could not be reached
    #[error("remote unreachable: {reason}")]
    RemoteUnreachable { reason: String },

    /// The moved entry disappeared before the remote confirmed the move
    #[error("entry '{entry}' was removed while its reorder was in flight")]
    EntryVanished { entry: EntryId },

    /// A live update payload could not be decoded
    #[error("invalid live update: {message}")]
    InvalidUpdate { message: String },

    /// Order arrays and parent references disagree
    #[error("invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Create an entry-not-in-container error
    pub fn not_in_container(entry: &EntryId, container: &ContainerId) -> Self {
        Self::EntryNotInContainer {
            entry: entry.clone(),
            container: container.clone(),
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error came from the mutation channel
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteRejected { .. } | Self::RemoteUnreachable { .. }
        )
    }

    /// Check if this error should produce user-facing feedback.
    ///
    /// Store-level errors are programming errors and stay in the logs.
    pub fn is_user_visible(&self) -> bool {
        self.is_remote() || matches!(self, Self::EntryVanished { .. } | Self::ReorderPending { .. })
    }
}
