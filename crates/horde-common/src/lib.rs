//! # Horde Common
//!
//! Common types, utilities, and shared abstractions for the Horde simulation.
//!
//! This crate provides foundational types used across all Horde crates:
//! - ID types (AgentId, SpawnerId) and a per-world ID allocator
//! - 2D vector helpers over `glam::Vec2`
//! - The simulation clock
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod math;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::math::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_allocation() {
        let mut ids = AgentIdAllocator::new();
        let id1 = ids.allocate();
        let id2 = ids.allocate();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!AgentId::NULL.is_valid());
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut a = AgentIdAllocator::new();
        let mut b = AgentIdAllocator::new();
        assert_eq!(a.allocate(), b.allocate());
    }

    #[test]
    fn test_config_error_wraps_into_horde_error() {
        let err: HordeError = ConfigError::NoSpawnPoints.into();
        assert_eq!(err.to_string(), "Config error: no spawn points configured");
    }
}
