//! Remote update ingestion
//!
//! Collaborators' confirmed changes arrive as [`LiveUpdate`]s. When nothing
//! local is in flight they are applied straight away: the last writer wins.
//! When an in-flight reorder touches them they wait, one per container,
//! until that reorder commits or rolls back, so a rollback can never clobber
//! them and a stale snapshot can never overwrite them.

use crate::board::{BoardState, ChangeCause, SharedBoard};
use crate::error::{Result, SyncError};
use crate::store::OrderedStore;
use crate::types::{ContainerId, LiveUpdate};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

/// What happened to an incoming update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Applied to the store
    Applied,
    /// Held until an in-flight reorder resolves
    Buffered,
    /// Held, replacing an older held update for the same container
    Superseded,
}

/// Applies live updates to the shared board
#[derive(Debug, Clone)]
pub struct RemoteUpdateIngestor {
    board: SharedBoard,
}

impl RemoteUpdateIngestor {
    /// Create an ingestor for a board
    pub fn new(board: SharedBoard) -> Self {
        Self { board }
    }

    /// Apply or buffer one update
    #[instrument(skip(self, update), fields(container = %update.container()))]
    pub async fn apply(&self, update: LiveUpdate) -> Result<IngestOutcome> {
        let mut state = self.board.lock().await;
        if !state.store().contains_container(update.container()) {
            warn!("live update for unknown container");
            return Err(SyncError::ContainerNotFound {
                id: update.container().clone(),
            });
        }

        if state.touches_pending(&update) {
            let outcome = state.buffer(update);
            debug!(?outcome, "live update held behind in-flight reorder");
            return Ok(outcome);
        }

        let touched = apply_update(state.store_mut(), &update)?;
        drop(state);
        debug!(touched = touched.len(), "live update applied");
        self.board.notify(touched, ChangeCause::Remote);
        Ok(IngestOutcome::Applied)
    }

    /// Decode a JSON live update, then apply or buffer it
    pub async fn apply_json(&self, payload: &str) -> Result<IngestOutcome> {
        let update: LiveUpdate = serde_json::from_str(payload).map_err(|e| {
            warn!(error = %e, "malformed live update");
            SyncError::InvalidUpdate {
                message: e.to_string(),
            }
        })?;
        self.apply(update).await
    }
}

/// Write one update into the store
pub(crate) fn apply_update(
    store: &mut OrderedStore,
    update: &LiveUpdate,
) -> Result<Vec<ContainerId>> {
    if let Some(entry) = update.moved_entry() {
        if !update.order().contains(entry) {
            warn!(%entry, dest = %update.container(), "moved entry missing from its new order");
        }
    }
    store.replace_order(update.container(), update.order().to_vec())
}

/// Apply every held update that no in-flight reorder touches any more.
///
/// Returns the containers that changed. Updates that no longer apply (their
/// container was deleted meanwhile) are logged and dropped.
pub(crate) fn flush_ready(state: &mut BoardState) -> Vec<ContainerId> {
    let mut touched = BTreeSet::new();
    for update in state.take_ready() {
        match apply_update(state.store_mut(), &update) {
            Ok(containers) => touched.extend(containers),
            Err(error) => {
                warn!(container = %update.container(), %error, "dropping buffered live update")
            }
        }
    }
    touched.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PendingReorder;
    use crate::types::{EntryId, ReorderId, ReorderRequest};

    fn board() -> SharedBoard {
        let mut store = OrderedStore::new();
        store.add_board("b").unwrap();
        store.add_list("b", "L1", None).unwrap();
        store.add_list("b", "L2", None).unwrap();
        store.add_card("L1", "c1", None).unwrap();
        store.add_card("L1", "c2", None).unwrap();
        store.add_card("L2", "c3", None).unwrap();
        SharedBoard::new(store)
    }

    fn order(container: &str, ids: &[&str]) -> LiveUpdate {
        LiveUpdate::ContainerOrder {
            container: container.into(),
            order: ids.iter().map(|id| EntryId::from(*id)).collect(),
        }
    }

    async fn begin(board: &SharedBoard, request: ReorderRequest) {
        let mut state = board.lock().await;
        let snapshot = state.store().snapshot(&request.scope()).unwrap();
        state
            .begin_reorder(PendingReorder {
                id: ReorderId::new(),
                request,
                snapshot,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_applies_when_idle() {
        let board = board();
        let mut changes = board.subscribe();
        let ingestor = RemoteUpdateIngestor::new(board.clone());

        let outcome = ingestor.apply(order("L1", &["c2", "c1"])).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Applied);
        assert_eq!(
            board.order(&"L1".into()).await.unwrap(),
            vec![EntryId::from("c2"), EntryId::from("c1")]
        );
        assert_eq!(changes.recv().await.unwrap().cause, ChangeCause::Remote);
    }

    #[tokio::test]
    async fn test_entry_moved_reparents() {
        let board = board();
        let ingestor = RemoteUpdateIngestor::new(board.clone());

        let update = LiveUpdate::EntryMoved {
            entry: "c1".into(),
            new_parent: "L2".into(),
            order: vec!["c3".into(), "c1".into()],
        };
        ingestor.apply(update).await.unwrap();

        assert_eq!(board.order(&"L1".into()).await.unwrap(), vec![EntryId::from("c2")]);
        let parent = board.read(|s| s.parent_of(&"c1".into()).cloned()).await;
        assert_eq!(parent, Some(ContainerId::from("L2")));
        board.check_invariants().await.unwrap();
    }

    #[tokio::test]
    async fn test_buffers_while_pending_and_flushes_after() {
        let board = board();
        let ingestor = RemoteUpdateIngestor::new(board.clone());
        begin(&board, ReorderRequest::within("c1", "L1", 1)).await;

        let first = ingestor.apply(order("L1", &["c1", "c2"])).await.unwrap();
        let second = ingestor.apply(order("L1", &["c2", "c1"])).await.unwrap();
        assert_eq!(first, IngestOutcome::Buffered);
        assert_eq!(second, IngestOutcome::Superseded);
        // Untouched containers still apply directly
        let other = ingestor.apply(order("L2", &["c3"])).await.unwrap();
        assert_eq!(other, IngestOutcome::Applied);

        let mut state = board.lock().await;
        state.finish_reorder(&"c1".into());
        let touched = flush_ready(&mut state);
        assert_eq!(touched, vec![ContainerId::from("L1")]);
        assert_eq!(
            state.store().order(&"L1".into()).unwrap(),
            &[EntryId::from("c2"), EntryId::from("c1")]
        );
        assert_eq!(state.buffered_len(), 0);
    }

    #[tokio::test]
    async fn test_apply_json() {
        let board = board();
        let ingestor = RemoteUpdateIngestor::new(board.clone());

        let payload = r#"{"type":"container_order","container":"L2","order":["c3","c4"]}"#;
        assert_eq!(
            ingestor.apply_json(payload).await.unwrap(),
            IngestOutcome::Applied
        );
        assert_eq!(
            board.order(&"L2".into()).await.unwrap(),
            vec![EntryId::from("c3"), EntryId::from("c4")]
        );

        let result = ingestor.apply_json(r#"{"type":"shuffle"}"#).await;
        assert!(matches!(result, Err(SyncError::InvalidUpdate { .. })));
    }

    #[tokio::test]
    async fn test_unknown_container_is_an_error() {
        let board = board();
        let ingestor = RemoteUpdateIngestor::new(board.clone());
        let result = ingestor.apply(order("nope", &[])).await;
        assert!(matches!(result, Err(SyncError::ContainerNotFound { .. })));
        board.check_invariants().await.unwrap();
    }
}
