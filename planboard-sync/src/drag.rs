//! Drag session state machine
//!
//! One gesture at a time: `Idle → Grabbed → Hovering → (dropped | cancelled)
//! → Idle`. The session never mutates the board. A successful release hands
//! a [`ReorderRequest`] to the caller and the session clears immediately,
//! without waiting for the reorder to resolve.

use crate::resolver::{resolve_index, Extent};
use crate::types::{ContainerId, ContainerKind, EntryId, EntryKind, ReorderRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Who may be grabbed. Implemented by the board state, which knows about
/// in-flight reorders and disabled-state flags.
pub trait GrabGuard {
    /// The entry is mid-reorder or flagged busy
    fn is_entry_locked(&self, entry: &EntryId) -> bool;

    /// The container is flagged busy
    fn is_container_disabled(&self, container: &ContainerId) -> bool;
}

/// What was grabbed, and from where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grab {
    pub entry: EntryId,
    pub kind: EntryKind,
    pub source: ContainerId,
}

/// Current phase of the gesture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    /// No gesture in progress
    #[default]
    Idle,
    /// An entry is held but not over a valid destination
    Grabbed(Grab),
    /// An entry is held over a valid destination
    Hovering {
        grab: Grab,
        dest: ContainerId,
        index: usize,
    },
}

/// Result of a grab attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabResult {
    /// The session started
    Started,
    /// Another session is active; the grab was ignored
    AlreadyActive,
    /// The entry is mid-reorder or busy
    EntryLocked,
    /// The source container is busy
    ContainerDisabled,
}

/// A container under the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverTarget {
    pub container: ContainerId,
    pub kind: ContainerKind,
}

impl HoverTarget {
    /// Create a hover target
    pub fn new(container: impl Into<ContainerId>, kind: ContainerKind) -> Self {
        Self {
            container: container.into(),
            kind,
        }
    }
}

/// A rendered sibling in the hovered container
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingBounds {
    pub entry: EntryId,
    pub extent: Extent,
}

impl SiblingBounds {
    /// Create sibling bounds
    pub fn new(entry: impl Into<EntryId>, start: f64, length: f64) -> Self {
        Self {
            entry: entry.into(),
            extent: Extent::new(start, length),
        }
    }
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Released over a valid destination
    Dropped(ReorderRequest),
    /// Released elsewhere; nothing to do
    Cancelled,
    /// No session was active
    Idle,
}

/// Single-slot drag session
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Check if a gesture is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    /// Start dragging `entry` out of `source`
    pub fn grab(
        &mut self,
        entry: impl Into<EntryId>,
        kind: EntryKind,
        source: impl Into<ContainerId>,
        guard: &impl GrabGuard,
    ) -> GrabResult {
        if self.is_active() {
            return GrabResult::AlreadyActive;
        }
        let entry = entry.into();
        let source = source.into();
        if guard.is_entry_locked(&entry) {
            debug!(%entry, "grab refused, entry locked");
            return GrabResult::EntryLocked;
        }
        if guard.is_container_disabled(&source) {
            debug!(%entry, %source, "grab refused, container disabled");
            return GrabResult::ContainerDisabled;
        }

        trace!(%entry, %source, "grabbed");
        self.state = DragState::Grabbed(Grab {
            entry,
            kind,
            source,
        });
        GrabResult::Started
    }

    /// Move the pointer over `target`.
    ///
    /// For a valid destination, resolves and records the candidate index and
    /// returns it. The dragged entry's own bounds are left out of `siblings`
    /// so the index refers to the order array after the entry's removal.
    /// Over an invalid destination the hover is cleared and `None` returned.
    pub fn hover(
        &mut self,
        target: &HoverTarget,
        pointer: f64,
        siblings: &[SiblingBounds],
    ) -> Option<usize> {
        let grab = match std::mem::take(&mut self.state) {
            DragState::Idle => return None,
            DragState::Grabbed(grab) | DragState::Hovering { grab, .. } => grab,
        };

        if !accepts(&grab, target) {
            self.state = DragState::Grabbed(grab);
            return None;
        }

        let extents: Vec<Extent> = siblings
            .iter()
            .filter(|sibling| sibling.entry != grab.entry)
            .map(|sibling| sibling.extent)
            .collect();
        let index = resolve_index(pointer, &extents);
        trace!(entry = %grab.entry, dest = %target.container, index, "hovering");
        self.state = DragState::Hovering {
            grab,
            dest: target.container.clone(),
            index,
        };
        Some(index)
    }

    /// The pointer left every container
    pub fn leave(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            DragState::Hovering { grab, .. } => DragState::Grabbed(grab),
            other => other,
        };
    }

    /// Release the pointer over `over` (or outside any container).
    ///
    /// The session is idle afterwards whatever happens next.
    pub fn release(&mut self, over: Option<&ContainerId>) -> Release {
        match std::mem::take(&mut self.state) {
            DragState::Idle => Release::Idle,
            DragState::Hovering { grab, dest, index } if over == Some(&dest) => {
                debug!(entry = %grab.entry, source = %grab.source, %dest, index, "dropped");
                Release::Dropped(ReorderRequest {
                    entry: grab.entry,
                    source: grab.source,
                    dest,
                    index,
                })
            }
            DragState::Grabbed(grab) | DragState::Hovering { grab, .. } => {
                debug!(entry = %grab.entry, "released outside a destination");
                Release::Cancelled
            }
        }
    }

    /// Abandon the gesture (e.g. escape). Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = DragState::Idle;
        was_active
    }
}

/// Cards may go into any list; lists only reorder within their own board.
fn accepts(grab: &Grab, target: &HoverTarget) -> bool {
    // Lists only move within their own board
    target.kind == grab.kind.parent_kind()
        && (grab.kind == EntryKind::Card || target.container == grab.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Guard {
        locked: HashSet<EntryId>,
        disabled: HashSet<ContainerId>,
    }

    impl GrabGuard for Guard {
        fn is_entry_locked(&self, entry: &EntryId) -> bool {
            self.locked.contains(entry)
        }

        fn is_container_disabled(&self, container: &ContainerId) -> bool {
            self.disabled.contains(container)
        }
    }

    fn list(id: &str) -> HoverTarget {
        HoverTarget::new(id, ContainerKind::List)
    }

    fn cards(ids: &[&str]) -> Vec<SiblingBounds> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| SiblingBounds::new(*id, i as f64 * 50.0, 50.0))
            .collect()
    }

    #[test]
    fn test_full_gesture_produces_request() {
        let mut session = DragSession::new();
        assert_eq!(
            session.grab("c1", EntryKind::Card, "L1", &Guard::default()),
            GrabResult::Started
        );
        assert_eq!(session.hover(&list("L2"), 10.0, &cards(&["c3"])), Some(0));

        let release = session.release(Some(&"L2".into()));
        assert_eq!(
            release,
            Release::Dropped(ReorderRequest::new("c1", "L1", "L2", 0))
        );
        assert_eq!(session.state(), &DragState::Idle);
    }

    #[test]
    fn test_hover_ignores_dragged_entry_bounds() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        // c1 still rendered at the top; pointer just below c2's midpoint
        let index = session.hover(&list("L1"), 80.0, &cards(&["c1", "c2", "c3"]));
        // Without c1: c2 at 50..100 (mid 75), c3 at 100..150
        assert_eq!(index, Some(1));
    }

    #[test]
    fn test_repeated_hover_updates_target() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        session.hover(&list("L1"), 0.0, &cards(&["c2"]));
        session.hover(&list("L2"), 90.0, &cards(&["c3"]));

        match session.state() {
            DragState::Hovering { dest, index, .. } => {
                assert_eq!(dest.as_str(), "L2");
                assert_eq!(*index, 1);
            }
            other => panic!("expected hovering, got {other:?}"),
        }
    }

    #[test]
    fn test_second_grab_is_ignored() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        assert_eq!(
            session.grab("c2", EntryKind::Card, "L1", &Guard::default()),
            GrabResult::AlreadyActive
        );
        assert!(matches!(session.state(), DragState::Grabbed(g) if g.entry.as_str() == "c1"));
    }

    #[test]
    fn test_grab_rejected_when_locked_or_disabled() {
        let mut guard = Guard::default();
        guard.locked.insert("c1".into());
        guard.disabled.insert("L2".into());

        let mut session = DragSession::new();
        assert_eq!(
            session.grab("c1", EntryKind::Card, "L1", &guard),
            GrabResult::EntryLocked
        );
        assert_eq!(
            session.grab("c3", EntryKind::Card, "L2", &guard),
            GrabResult::ContainerDisabled
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_list_only_hovers_its_own_board() {
        let mut session = DragSession::new();
        session.grab("L1", EntryKind::List, "b", &Guard::default());

        assert_eq!(session.hover(&list("L2"), 0.0, &[]), None);
        assert_eq!(
            session.hover(&HoverTarget::new("other", ContainerKind::Board), 0.0, &[]),
            None
        );
        assert_eq!(
            session.hover(&HoverTarget::new("b", ContainerKind::Board), 0.0, &[]),
            Some(0)
        );
    }

    #[test]
    fn test_card_cannot_hover_board() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        session.hover(&list("L1"), 0.0, &[]);
        assert_eq!(
            session.hover(&HoverTarget::new("b", ContainerKind::Board), 0.0, &[]),
            None
        );
        // Invalid hover falls back to grabbed, so release cancels
        assert!(matches!(session.state(), DragState::Grabbed(_)));
        assert_eq!(session.release(Some(&"b".into())), Release::Cancelled);
    }

    #[test]
    fn test_release_outside_cancels() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        session.hover(&list("L2"), 0.0, &[]);
        assert_eq!(session.release(None), Release::Cancelled);
        assert!(!session.is_active());
        assert_eq!(session.release(None), Release::Idle);
    }

    #[test]
    fn test_leave_then_release_cancels() {
        let mut session = DragSession::new();
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        session.hover(&list("L2"), 0.0, &[]);
        session.leave();
        assert_eq!(session.release(Some(&"L2".into())), Release::Cancelled);
    }

    #[test]
    fn test_explicit_cancel() {
        let mut session = DragSession::new();
        assert!(!session.cancel());
        session.grab("c1", EntryKind::Card, "L1", &Guard::default());
        assert!(session.cancel());
        assert_eq!(session.state(), &DragState::Idle);
    }
}
