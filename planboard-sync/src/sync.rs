//! `BoardSync`: the entry point a presentation layer talks to.
//!
//! Wires pointer gestures through the drag session into the coordinator, and
//! live updates into the ingestor, all against one [`SharedBoard`].

use crate::board::{BoardChange, SharedBoard};
use crate::channel::MutationChannel;
use crate::config::SyncConfig;
use crate::coordinator::{ReorderCoordinator, ReorderOutcome};
use crate::drag::{DragSession, DragState, GrabResult, HoverTarget, Release, SiblingBounds};
use crate::error::Result;
use crate::ingest::{IngestOutcome, RemoteUpdateIngestor};
use crate::store::OrderedStore;
use crate::types::{ContainerId, EntryId, EntryKind, LiveUpdate, ReorderRecord, ReorderRequest};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Pointer input, already mapped onto board ids by the view
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// Pointer pressed on an entry
    Grab {
        entry: EntryId,
        kind: EntryKind,
        source: ContainerId,
    },
    /// Pointer moved to `(x, y)`; `target` is the container under it, if
    /// any, and `siblings` the rendered children of that container in display
    /// order, measured along the container's layout axis
    Move {
        target: Option<HoverTarget>,
        x: f64,
        y: f64,
        siblings: Vec<SiblingBounds>,
    },
    /// Pointer released over `over`, if over a container
    Drop { over: Option<ContainerId> },
    /// Gesture abandoned (escape, focus loss)
    Cancel,
}

/// What a gesture event did
#[derive(Debug)]
pub enum GestureOutcome {
    /// Result of a grab
    Grab(GrabResult),
    /// Candidate index for a valid destination, `None` otherwise
    Hover(Option<usize>),
    /// A reorder was started; the handle resolves with its outcome
    Dropped(JoinHandle<ReorderOutcome>),
    /// The gesture ended without a reorder
    Cancelled,
    /// No gesture was active
    Ignored,
}

/// Drag-and-drop reordering with optimistic remote sync for one board
#[derive(Debug)]
pub struct BoardSync<C> {
    board: SharedBoard,
    coordinator: Arc<ReorderCoordinator<C>>,
    ingestor: RemoteUpdateIngestor,
    session: Mutex<DragSession>,
}

impl<C: MutationChannel + 'static> BoardSync<C> {
    /// Create with default settings
    pub fn new(store: OrderedStore, channel: C) -> Self {
        Self::with_config(store, channel, SyncConfig::default())
    }

    /// Create from a loaded configuration
    pub fn with_config(store: OrderedStore, channel: C, config: SyncConfig) -> Self {
        let board = SharedBoard::with_config(store, &config);
        let coordinator = Arc::new(ReorderCoordinator::with_config(
            board.clone(),
            channel,
            config,
        ));
        Self {
            ingestor: RemoteUpdateIngestor::new(board.clone()),
            board,
            coordinator,
            session: Mutex::new(DragSession::new()),
        }
    }

    /// The shared board
    pub fn board(&self) -> &SharedBoard {
        &self.board
    }

    /// The coordinator
    pub fn coordinator(&self) -> &Arc<ReorderCoordinator<C>> {
        &self.coordinator
    }

    /// Subscribe to board change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<BoardChange> {
        self.board.subscribe()
    }

    /// Current drag state
    pub async fn drag_state(&self) -> DragState {
        self.session.lock().await.state().clone()
    }

    /// Feed one pointer event through the drag session.
    ///
    /// A drop over a valid destination starts the reorder on a separate task
    /// and returns at once; the session is idle again before the remote call
    /// is made.
    pub async fn handle_gesture(&self, event: GestureEvent) -> GestureOutcome {
        match event {
            GestureEvent::Grab {
                entry,
                kind,
                source,
            } => {
                let state = self.board.lock().await;
                let result = self
                    .session
                    .lock()
                    .await
                    .grab(entry, kind, source, &*state);
                GestureOutcome::Grab(result)
            }
            GestureEvent::Move {
                target,
                x,
                y,
                siblings,
            } => {
                let mut session = self.session.lock().await;
                if !session.is_active() {
                    return GestureOutcome::Ignored;
                }
                match target {
                    Some(target) => {
                        let pointer = target.kind.axis().project(x, y);
                        GestureOutcome::Hover(session.hover(&target, pointer, &siblings))
                    }
                    None => {
                        session.leave();
                        GestureOutcome::Hover(None)
                    }
                }
            }
            GestureEvent::Drop { over } => {
                let release = self.session.lock().await.release(over.as_ref());
                match release {
                    Release::Dropped(request) => GestureOutcome::Dropped(self.spawn_reorder(request)),
                    Release::Cancelled => GestureOutcome::Cancelled,
                    Release::Idle => GestureOutcome::Ignored,
                }
            }
            GestureEvent::Cancel => {
                if self.session.lock().await.cancel() {
                    GestureOutcome::Cancelled
                } else {
                    GestureOutcome::Ignored
                }
            }
        }
    }

    /// Run a reorder to completion
    pub async fn perform(&self, request: ReorderRequest) -> ReorderOutcome {
        self.coordinator.perform_reorder(request).await
    }

    /// Run a reorder on its own task
    pub fn spawn_reorder(&self, request: ReorderRequest) -> JoinHandle<ReorderOutcome> {
        debug!(entry = %request.entry, dest = %request.dest, "spawning reorder");
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move { coordinator.perform_reorder(request).await })
    }

    /// Apply or buffer a collaborator's update
    pub async fn apply_live_update(&self, update: LiveUpdate) -> Result<IngestOutcome> {
        self.ingestor.apply(update).await
    }

    /// Decode and apply or buffer a collaborator's update
    pub async fn apply_live_update_json(&self, payload: &str) -> Result<IngestOutcome> {
        self.ingestor.apply_json(payload).await
    }

    /// Recorded reorder attempts, newest first
    pub async fn activity(&self) -> Vec<ReorderRecord> {
        self.coordinator.activity().await
    }
}
