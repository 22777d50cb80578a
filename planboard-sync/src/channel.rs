//! The mutation channel seam: how confirmed reorders reach the backend.
//!
//! The engine does not care about the wire format. It needs the call to
//! resolve eventually, either with an optional authoritative snapshot of the
//! affected containers or with a [`RemoteError`].

use crate::error::SyncError;
use crate::types::{AuthoritativeState, ReorderRequest};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Why the backend did not confirm a reorder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The backend answered and refused (stale index, entry deleted, ...)
    #[error("rejected: {reason}")]
    Rejected { reason: String },

    /// The backend could not be reached
    #[error("unreachable: {reason}")]
    Unreachable { reason: String },
}

impl RemoteError {
    /// Create a rejection
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create a transport failure
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::Rejected { reason } => SyncError::RemoteRejected { reason },
            RemoteError::Unreachable { reason } => SyncError::RemoteUnreachable { reason },
        }
    }
}

/// Sends a reorder to the backend
#[async_trait]
pub trait MutationChannel: Send + Sync {
    /// Ask the backend to move `request.entry`.
    ///
    /// `Ok(Some(state))` carries the authoritative order of the affected
    /// containers; `Ok(None)` confirms without a payload.
    async fn reorder_entry(
        &self,
        request: &ReorderRequest,
    ) -> Result<Option<AuthoritativeState>, RemoteError>;
}

#[async_trait]
impl<T: MutationChannel + ?Sized> MutationChannel for Arc<T> {
    async fn reorder_entry(
        &self,
        request: &ReorderRequest,
    ) -> Result<Option<AuthoritativeState>, RemoteError> {
        (**self).reorder_entry(request).await
    }
}
