//! Reorder coordinator: optimistic apply, remote call, commit or rollback.
//!
//! One call to [`ReorderCoordinator::perform_reorder`] runs the protocol for
//! one reorder:
//!
//! 1. refuse if a reorder of the same entry is already in flight;
//! 2. snapshot the scope (source, destination, entry);
//! 3. apply the move to the store so the UI reflects it immediately;
//! 4. call the mutation channel, with the board lock released;
//! 5. on success, let an authoritative payload overwrite the optimistic
//!    guess;
//! 6. on failure, restore the snapshot.
//!
//! Either way the pending reorder is discarded and any live updates held
//! behind it are flushed. Lists within a board and cards within or across
//! lists go through exactly the same steps.

use crate::board::{BoardState, ChangeCause, PendingReorder, SharedBoard};
use crate::channel::MutationChannel;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::ingest::flush_ready;
use crate::types::{
    ActivityLog, AuthoritativeState, OutcomeKind, ReorderId, ReorderRecord,
    ReorderRequest,
};
use std::collections::BTreeSet;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// How a reorder ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The remote confirmed the move. `reconciled` is set when its payload
    /// replaced the optimistic order.
    Committed { reconciled: bool },
    /// The remote did not confirm; local state was restored
    RolledBack { error: SyncError },
    /// Another reorder of the same entry is in flight; nothing was touched
    Rejected { error: SyncError },
    /// The store refused the move; nothing was touched
    Aborted { error: SyncError },
}

impl ReorderOutcome {
    /// Whether the reorder stuck
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// User-facing explanation for a failed reorder
    pub fn message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// The error behind a failed reorder
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Committed { .. } => None,
            Self::RolledBack { error } | Self::Rejected { error } | Self::Aborted { error } => {
                Some(error)
            }
        }
    }

    /// Outcome classification for activity records
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Committed { reconciled: false } => OutcomeKind::Committed,
            Self::Committed { reconciled: true } => OutcomeKind::Reconciled,
            Self::RolledBack { .. } => OutcomeKind::RolledBack,
            Self::Rejected { .. } => OutcomeKind::Rejected,
            Self::Aborted { .. } => OutcomeKind::Aborted,
        }
    }
}

/// Runs the optimistic reorder protocol against a shared board
#[derive(Debug)]
pub struct ReorderCoordinator<C> {
    board: SharedBoard,
    channel: C,
    config: SyncConfig,
    activity: Mutex<ActivityLog>,
}

impl<C: MutationChannel> ReorderCoordinator<C> {
    /// Create a coordinator with default settings
    pub fn new(board: SharedBoard, channel: C) -> Self {
        Self::with_config(board, channel, SyncConfig::default())
    }

    /// Create a coordinator
    pub fn with_config(board: SharedBoard, channel: C, config: SyncConfig) -> Self {
        let activity = Mutex::new(ActivityLog::new(config.activity_capacity));
        Self {
            board,
            channel,
            config,
            activity,
        }
    }

    /// The board this coordinator mutates
    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    /// The mutation channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Recorded attempts, newest first
    pub async fn activity(&self) -> Vec<ReorderRecord> {
        self.activity.lock().await.records().cloned().collect()
    }

    /// Run the full protocol for one reorder
    #[instrument(
        skip(self, request),
        fields(
            entry = %request.entry,
            source = %request.source,
            dest = %request.dest,
            index = request.index,
        )
    )]
    pub async fn perform_reorder(&self, request: ReorderRequest) -> ReorderOutcome {
        let started = Instant::now();
        let id = ReorderId::new();
        let outcome = self.run(id, &request).await;

        match &outcome {
            ReorderOutcome::Committed { reconciled } => {
                info!(%id, reconciled, "reorder committed")
            }
            ReorderOutcome::RolledBack { error } => warn!(%id, %error, "reorder rolled back"),
            ReorderOutcome::Rejected { error } => debug!(%id, %error, "reorder rejected"),
            ReorderOutcome::Aborted { error } => error!(%id, %error, "reorder aborted"),
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let record = ReorderRecord::new(id, request, outcome.kind(), outcome.message(), duration_ms);
        self.activity.lock().await.push(record);
        outcome
    }

    async fn run(&self, id: ReorderId, request: &ReorderRequest) -> ReorderOutcome {
        if let Err(outcome) = self.apply_optimistic(id, request).await {
            return outcome;
        }

        let remote = self.call_remote(request).await;

        let mut state = self.board.lock().await;
        let Some((position, pending)) = state.finish_reorder(&request.entry) else {
            // Only this call removes its own pending reorder
            error!(entry = %request.entry, "pending reorder missing at resolution");
            return ReorderOutcome::Aborted {
                error: SyncError::invariant("pending reorder missing at resolution"),
            };
        };

        let outcome = match remote {
            Ok(payload) => self.commit(&mut state, position, &pending, payload),
            Err(error) => {
                self.roll_back(&mut state, position, &pending);
                ReorderOutcome::RolledBack { error }
            }
        };

        let flushed = flush_ready(&mut state);
        drop(state);
        if !flushed.is_empty() {
            debug!(count = flushed.len(), "flushed held live updates");
        }
        self.board.notify(flushed, ChangeCause::Remote);
        outcome
    }

    /// Steps 1 to 3, under the board lock
    async fn apply_optimistic(
        &self,
        id: ReorderId,
        request: &ReorderRequest,
    ) -> std::result::Result<(), ReorderOutcome> {
        let mut state = self.board.lock().await;
        if state.is_pending(&request.entry) {
            return Err(ReorderOutcome::Rejected {
                error: SyncError::ReorderPending {
                    entry: request.entry.clone(),
                },
            });
        }

        let scope = request.scope();
        let snapshot = state
            .store()
            .snapshot(&scope)
            .map_err(|error| ReorderOutcome::Aborted { error })?;

        let landed = state
            .store_mut()
            .apply(request)
            .map_err(|error| ReorderOutcome::Aborted { error })?;

        if self.config.verify_invariants {
            if let Err(error) = state.store().check_invariants() {
                state.store_mut().restore(&snapshot);
                return Err(ReorderOutcome::Aborted { error });
            }
        }

        state
            .begin_reorder(PendingReorder {
                id,
                request: request.clone(),
                snapshot,
            })
            .map_err(|error| ReorderOutcome::Rejected { error })?;
        drop(state);

        debug!(landed, "optimistic reorder applied");
        self.board.notify(scope.containers(), ChangeCause::Optimistic);
        Ok(())
    }

    /// Step 4. The only suspension point.
    async fn call_remote(&self, request: &ReorderRequest) -> Result<Option<AuthoritativeState>> {
        let timeout = self.config.remote_timeout();
        match tokio::time::timeout(timeout, self.channel.reorder_entry(request)).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::RemoteUnreachable {
                reason: format!("no response after {}ms", timeout.as_millis()),
            }),
        }
    }

    /// Step 5
    fn commit(
        &self,
        state: &mut BoardState,
        position: usize,
        pending: &PendingReorder,
        payload: Option<AuthoritativeState>,
    ) -> ReorderOutcome {
        let entry = &pending.request.entry;
        if !state.store().contains_entry(entry) {
            self.roll_back(state, position, pending);
            return ReorderOutcome::RolledBack {
                error: SyncError::EntryVanished {
                    entry: entry.clone(),
                },
            };
        }

        let Some(payload) = payload.filter(|payload| !payload.is_empty()) else {
            self.board
                .notify(pending.snapshot.scope().containers(), ChangeCause::Committed);
            return ReorderOutcome::Committed { reconciled: false };
        };

        let mut touched = BTreeSet::new();
        for container in payload.containers {
            match state.store_mut().replace_order(&container.id, container.order) {
                Ok(changed) => touched.extend(changed),
                Err(error) => {
                    warn!(container = %container.id, %error, "skipping authoritative container")
                }
            }
        }
        debug!(containers = touched.len(), "reconciled with authoritative state");
        self.board
            .notify(touched.into_iter().collect(), ChangeCause::Reconciled);
        ReorderOutcome::Committed { reconciled: true }
    }

    /// Step 6. Reorders begun later in the same containers are replayed on
    /// top of the restored state.
    fn roll_back(&self, state: &mut BoardState, position: usize, pending: &PendingReorder) {
        let touched = state.roll_back(position, pending);
        if self.config.verify_invariants {
            if let Err(error) = state.store().check_invariants() {
                error!(%error, "store inconsistent after rollback");
            }
        }
        self.board.notify(touched, ChangeCause::RolledBack);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RemoteError;
    use crate::store::OrderedStore;
    use crate::types::{ContainerState, EntryId};
    use async_trait::async_trait;

    /// Answers every call the same way
    struct Scripted(std::result::Result<Option<AuthoritativeState>, RemoteError>);

    #[async_trait]
    impl MutationChannel for Scripted {
        async fn reorder_entry(
            &self,
            _request: &ReorderRequest,
        ) -> std::result::Result<Option<AuthoritativeState>, RemoteError> {
            self.0.clone()
        }
    }

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

    async fn order(board: &SharedBoard, id: &str) -> Vec<String> {
        board
            .order(&id.into())
            .await
            .unwrap()
            .iter()
            .map(|e| e.as_str().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_commit_keeps_optimistic_order() {
        let board = board();
        let coordinator = ReorderCoordinator::new(board.clone(), Scripted(Ok(None)));

        let outcome = coordinator
            .perform_reorder(ReorderRequest::new("c1", "L1", "L2", 0))
            .await;

        assert_eq!(outcome, ReorderOutcome::Committed { reconciled: false });
        assert!(outcome.succeeded());
        assert!(outcome.message().is_none());
        assert_eq!(order(&board, "L1").await, vec!["c2"]);
        assert_eq!(order(&board, "L2").await, vec!["c1", "c3"]);
        assert!(!board.is_pending(&"c1".into()).await);
    }

    #[tokio::test]
    async fn test_rejection_restores_snapshot() {
        let board = board();
        let coordinator = ReorderCoordinator::new(
            board.clone(),
            Scripted(Err(RemoteError::rejected("stale index"))),
        );

        let outcome = coordinator
            .perform_reorder(ReorderRequest::new("c1", "L1", "L2", 0))
            .await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.kind(), OutcomeKind::RolledBack);
        assert_eq!(
            outcome.message().as_deref(),
            Some("remote rejected reorder: stale index")
        );
        assert_eq!(order(&board, "L1").await, vec!["c1", "c2"]);
        assert_eq!(order(&board, "L2").await, vec!["c3"]);
        board.check_invariants().await.unwrap();
    }

    #[tokio::test]
    async fn test_authoritative_payload_wins() {
        let board = board();
        // The backend also saw a collaborator's c4 land in L2
        let payload = AuthoritativeState::default()
            .with_container(ContainerState::new("L1", ["c2"]))
            .with_container(ContainerState::new("L2", ["c3", "c4", "c1"]));
        let coordinator = ReorderCoordinator::new(board.clone(), Scripted(Ok(Some(payload))));

        let outcome = coordinator
            .perform_reorder(ReorderRequest::new("c1", "L1", "L2", 0))
            .await;

        assert_eq!(outcome, ReorderOutcome::Committed { reconciled: true });
        assert_eq!(order(&board, "L2").await, vec!["c3", "c4", "c1"]);
        board.check_invariants().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_error_aborts_without_mutation() {
        let board = board();
        let coordinator = ReorderCoordinator::new(board.clone(), Scripted(Ok(None)));

        let outcome = coordinator
            .perform_reorder(ReorderRequest::new("c3", "L1", "L2", 0))
            .await;

        assert!(matches!(
            outcome,
            ReorderOutcome::Aborted {
                error: SyncError::EntryNotInContainer { .. }
            }
        ));
        assert_eq!(order(&board, "L1").await, vec!["c1", "c2"]);
        assert_eq!(board.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_activity_is_recorded() {
        let board = board();
        let config = SyncConfig::default().with_activity_capacity(1);
        let coordinator = ReorderCoordinator::with_config(board, Scripted(Ok(None)), config);

        coordinator
            .perform_reorder(ReorderRequest::within("c1", "L1", 1))
            .await;
        coordinator
            .perform_reorder(ReorderRequest::within("c1", "L1", 0))
            .await;

        let records = coordinator.activity().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request.index, 0);
        assert_eq!(records[0].outcome, OutcomeKind::Committed);
        assert_eq!(records[0].request.entry, EntryId::from("c1"));
    }
}
