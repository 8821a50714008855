//! Core types used throughout the minigame runtime

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for entities in the ECS.
///
/// Ids are handed out in strictly increasing order by a `World` and are never
/// reused, so a stale id can never alias a newer entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Wrap a raw id (mainly for testing).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value of this id.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}
