//! Activity records for reorder attempts

use super::ids::ReorderId;
use super::reorder::ReorderRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How a reorder attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Confirmed by the remote, optimistic guess kept
    Committed,
    /// Confirmed by the remote, local state overwritten by its payload
    Reconciled,
    /// Remote failure, snapshot restored
    RolledBack,
    /// Another reorder of the same entry was in flight
    Rejected,
    /// The store refused the optimistic mutation
    Aborted,
}

/// A record of one reorder attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRecord {
    /// Unique ID for this attempt
    pub id: ReorderId,

    /// When the attempt finished
    pub timestamp: DateTime<Utc>,

    /// What was requested
    pub request: ReorderRequest,

    /// How it ended
    pub outcome: OutcomeKind,

    /// Error message for failed attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// How long the attempt took, remote round trip included
    pub duration_ms: u64,
}

impl ReorderRecord {
    /// Create a new record
    pub fn new(
        id: ReorderId,
        request: ReorderRequest,
        outcome: OutcomeKind,
        error: Option<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            request,
            outcome,
            error,
            duration_ms,
        }
    }
}

/// Bounded in-memory activity log, newest first
#[derive(Debug, Clone)]
pub struct ActivityLog {
    records: VecDeque<ReorderRecord>,
    capacity: usize,
}

impl ActivityLog {
    /// Create a log keeping at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Record an attempt, evicting the oldest record when full
    pub fn push(&mut self, record: ReorderRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    /// Records, newest first
    pub fn records(&self) -> impl Iterator<Item = &ReorderRecord> {
        self.records.iter()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
