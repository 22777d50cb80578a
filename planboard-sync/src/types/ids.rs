//! Identifier newtypes.
//!
//! Container and entry ids are opaque strings handed to us by the backend.
//! A List is both an entry (of its board) and a container (of its cards); the
//! two ids share the same string, see [`EntryId::as_container`].

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }
    };
}

string_id!(
    /// Identifier of a container (a board or a list)
    ContainerId
);

string_id!(
    /// Identifier of an entry (a list or a card)
    EntryId
);

impl EntryId {
    /// The container id designated by a List entry
    pub fn as_container(&self) -> ContainerId {
        ContainerId(self.0.clone())
    }
}

impl ContainerId {
    /// The entry id of a List container
    pub fn as_entry(&self) -> EntryId {
        EntryId(self.0.clone())
    }
}

/// Identifier of a single reorder attempt, used in logs and activity records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReorderId(Ulid);

impl ReorderId {
    /// Generate a fresh, time-ordered id
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ReorderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReorderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
