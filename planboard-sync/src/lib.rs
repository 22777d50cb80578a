//! Ordered-collection sync engine for kanban boards
//!
//! Users drag lists across a board and cards within and across lists. Every
//! drop is applied locally at once, sent to the backend, and then either kept
//! (possibly replaced by the backend's authoritative order) or rolled back.
//! Collaborators' changes stream in concurrently.
//!
//! ## Overview
//!
//! - **Position resolution** - pointer coordinate + sibling extents → index
//! - **Drag session** - one gesture at a time, never touches the board
//! - **Ordered store** - order arrays and parent references kept consistent
//! - **Reorder coordinator** - optimistic apply, remote call, commit or rollback
//! - **Remote ingestion** - live updates, held back while a reorder they touch
//!   is in flight
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use planboard_sync::{
//!     AuthoritativeState, BoardSync, MutationChannel, OrderedStore, RemoteError, ReorderRequest,
//! };
//! use async_trait::async_trait;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl MutationChannel for Backend {
//!     async fn reorder_entry(
//!         &self,
//!         _request: &ReorderRequest,
//!     ) -> Result<Option<AuthoritativeState>, RemoteError> {
//!         Ok(None)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = OrderedStore::new();
//! store.add_board("board")?;
//! store.add_list("board", "todo", Some("To do".into()))?;
//! store.add_list("board", "done", Some("Done".into()))?;
//! store.add_card("todo", "card-1", None)?;
//!
//! let sync = BoardSync::new(store, Backend);
//! let outcome = sync
//!     .perform(ReorderRequest::new("card-1", "todo", "done", 0))
//!     .await;
//! assert!(outcome.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod drag;
mod error;
pub mod ingest;
pub mod logging;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod types;

pub use board::{BoardChange, ChangeCause, SharedBoard};
pub use channel::{MutationChannel, RemoteError};
pub use config::SyncConfig;
pub use coordinator::{ReorderCoordinator, ReorderOutcome};
pub use drag::{DragSession, DragState, GrabResult, HoverTarget, Release, SiblingBounds};
pub use error::{Result, SyncError};
pub use ingest::{IngestOutcome, RemoteUpdateIngestor};
pub use logging::init_tracing;
pub use resolver::{resolve_index, Axis, Extent};
pub use store::{OrderedStore, ScopedSnapshot};
pub use sync::{BoardSync, GestureEvent, GestureOutcome};
pub use types::*;
