//! Error types for the Horde simulation.

use thiserror::Error;

/// Top-level error type for Horde operations.
#[derive(Debug, Error)]
pub enum HordeError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
///
/// These are raised once at setup; nothing in the per-tick path returns them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A fixed-point spawner was configured without any points
    #[error("no spawn points configured")]
    NoSpawnPoints,

    /// A spawner was configured with room for zero agents
    #[error("spawn capacity must be at least 1")]
    ZeroCapacity,

    /// A spawn radius was negative or not finite
    #[error("invalid spawn radius: {0}")]
    InvalidSpawnRadius(f32),

    /// An archetype name did not resolve
    #[error("unknown archetype: {0}")]
    UnknownArchetype(String),

    /// Two archetypes share a name
    #[error("duplicate archetype: {0}")]
    DuplicateArchetype(String),

    /// A configuration document could not be parsed
    #[error("failed to parse {format} config: {message}")]
    Parse {
        /// Document format (ron, toml, ...)
        format: &'static str,
        /// Parser message
        message: String,
    },
}

/// Result type alias for Horde operations.
pub type HordeResult<T> = Result<T, HordeError>;
