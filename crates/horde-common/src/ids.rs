//! ID types for agents and spawners.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for an agent (enemy or player) in the simulation.
///
/// Handles are never reused within one world, so a stale handle simply
/// stops resolving once its agent has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u64);

impl AgentId {
    /// Creates an agent ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid agent ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) agent ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Identifier for a population spawner registered with a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpawnerId(u32);

impl SpawnerId {
    /// Creates a spawner ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpawnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawner#{}", self.0)
    }
}

/// Monotonic allocator for agent handles.
///
/// Owned by a world rather than shared globally so that two worlds built
/// from the same seed hand out identical IDs.
#[derive(Debug, Clone)]
pub struct AgentIdAllocator {
    next: u64,
}

impl Default for AgentIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentIdAllocator {
    /// Creates an allocator whose first handle is `agent#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Hands out the next unused handle.
    pub fn allocate(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }

    /// Number of handles allocated so far.
    #[must_use]
    pub const fn allocated(&self) -> u64 {
        self.next - 1
    }
}
