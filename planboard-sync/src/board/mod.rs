//! The shared board: the single mutable resource the coordinator, the
//! ingestor and the CRUD layer all go through.
//!
//! The lock is only ever held for synchronous work. The coordinator releases
//! it before calling the mutation channel, which is why remote updates that
//! touch an in-flight reorder are buffered instead of applied.

mod state;

pub use state::{BoardState, DisabledFlags, PendingReorder};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::store::OrderedStore;
use crate::types::{ContainerId, Entry, EntryId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::trace;

/// Why a set of containers changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// A reorder was applied ahead of remote confirmation
    Optimistic,
    /// The remote confirmed a reorder without a payload
    Committed,
    /// The remote's authoritative payload replaced local order
    Reconciled,
    /// A failed reorder was undone
    RolledBack,
    /// A collaborator's update was applied
    Remote,
    /// The CRUD layer inserted or removed an entry
    Local,
}

/// Notification that the order arrays of some containers changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardChange {
    pub containers: Vec<ContainerId>,
    pub cause: ChangeCause,
}

/// Cloneable handle to the board state
#[derive(Debug, Clone)]
pub struct SharedBoard {
    state: Arc<Mutex<BoardState>>,
    changes: broadcast::Sender<BoardChange>,
}

impl SharedBoard {
    /// Share a store using default settings
    pub fn new(store: OrderedStore) -> Self {
        Self::with_config(store, &SyncConfig::default())
    }

    /// Share a store, sizing the change channel from config
    pub fn with_config(store: OrderedStore, config: &SyncConfig) -> Self {
        let (changes, _) = broadcast::channel(config.change_buffer.max(1));
        Self {
            state: Arc::new(Mutex::new(BoardState::new(store))),
            changes,
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().await
    }

    /// Run a read-only closure against the store
    pub async fn read<R>(&self, f: impl FnOnce(&OrderedStore) -> R) -> R {
        let state = self.lock().await;
        f(state.store())
    }

    /// Copy of a container's order array
    pub async fn order(&self, container: &ContainerId) -> Result<Vec<EntryId>> {
        self.read(|store| store.order(container).map(<[EntryId]>::to_vec))
            .await
    }

    /// Receive a [`BoardChange`] for every mutation from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BoardChange> {
        self.changes.subscribe()
    }

    pub(crate) fn notify(&self, containers: Vec<ContainerId>, cause: ChangeCause) {
        if containers.is_empty() {
            return;
        }
        trace!(?cause, count = containers.len(), "board changed");
        // No subscribers is fine
        let _ = self.changes.send(BoardChange { containers, cause });
    }

    // =========================================================================
    // CRUD layer hooks
    // =========================================================================

    /// Insert an entry on behalf of the CRUD layer
    pub async fn insert_entry(&self, entry: Entry, index: Option<usize>) -> Result<()> {
        let parent = entry.parent.clone();
        self.lock().await.store_mut().insert_entry(entry, index)?;
        self.notify(vec![parent], ChangeCause::Local);
        Ok(())
    }

    /// Remove an entry on behalf of the CRUD layer
    pub async fn remove_entry(&self, id: &EntryId) -> Result<()> {
        let touched = self.lock().await.store_mut().remove_entry(id)?;
        self.notify(touched, ChangeCause::Local);
        Ok(())
    }

    /// Mark a container busy (or not). Busy containers cannot be grabbed from.
    pub async fn set_container_disabled(&self, id: impl Into<ContainerId>, disabled: bool) {
        self.lock()
            .await
            .disabled_mut()
            .set_container(id.into(), disabled);
    }

    /// Mark an entry busy (or not). Busy entries cannot be grabbed.
    pub async fn set_entry_disabled(&self, id: impl Into<EntryId>, disabled: bool) {
        self.lock().await.disabled_mut().set_entry(id.into(), disabled);
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Check if an entry has a reorder in flight
    pub async fn is_pending(&self, entry: &EntryId) -> bool {
        self.lock().await.is_pending(entry)
    }

    /// Number of reorders in flight
    pub async fn pending_len(&self) -> usize {
        self.lock().await.pending_len()
    }

    /// Number of remote updates waiting on in-flight reorders
    pub async fn buffered_len(&self) -> usize {
        self.lock().await.buffered_len()
    }

    /// Verify the store's invariants
    pub async fn check_invariants(&self) -> Result<()> {
        self.lock().await.store().check_invariants()
    }
}
