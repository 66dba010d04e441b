//! # Horde Sim
//!
//! Enemy behavior and combat simulation core.
//!
//! This crate provides:
//! - The damage pipeline (shield, then health, then a one-shot death)
//! - Steering behaviors (seek, circle, separation) and facing
//! - The per-agent behavior state machine (Idle/Patrol/Chase/Attack/Dead)
//! - Rate- and capacity-limited population spawners
//! - A fixed-tick world that ties them together over a position snapshot
//! - An event bus, a spatial index and score/lives bookkeeping
//!
//! Everything runs single-threaded inside [`World::tick`]. Effects of a tick
//! (damage, deaths, spawns) are visible to decisions from the next tick on.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod agent;
pub mod behavior;
pub mod config;
pub mod events;
pub mod player;
pub mod session;
pub mod spatial;
pub mod spawner;
pub mod steering;
pub mod vitals;
pub mod world;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agent::*;
    pub use crate::behavior::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::player::*;
    pub use crate::session::*;
    pub use crate::spatial::*;
    pub use crate::spawner::*;
    pub use crate::steering::*;
    pub use crate::vitals::*;
    pub use crate::world::*;
}

pub use prelude::*;
