//! Horde Engine - headless driver for the Horde simulation.
//!
//! This crate provides the engine configuration file, fixed-timestep timing
//! and the run loop that ties the world, the scripted player and the game
//! session together.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod runner;
pub mod timing;
