//! Core types for the synchronization engine

mod board;
mod ids;
mod log;
mod reorder;

// Re-export all types
pub use board::{Container, ContainerKind, Entry, EntryKind};
pub use ids::{ContainerId, EntryId, ReorderId};
pub use log::{ActivityLog, OutcomeKind, ReorderRecord};
pub use reorder::{
    AuthoritativeState, ContainerState, LiveUpdate, ReorderRequest, ReorderScope,
};
