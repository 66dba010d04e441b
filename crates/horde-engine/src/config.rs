//! Engine configuration.
//!
//! One TOML document describes a whole run: timing, the world seed, the
//! player, the enemy archetypes, which spawners produce them and the
//! session rules. Archetypes can also be pulled in from a RON table.

use std::fs;
use std::path::{Path, PathBuf};

use horde_common::{ConfigError, HordeError, HordeResult, Vec2};
use horde_sim::{
    AgentConfig, ArchetypeTable, PlayerConfig, SessionConfig, SpawnPlacement, SpawnerConfig,
    WorldConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "horde.toml";

/// A spawner entry: which archetype it produces and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerEntry {
    /// Archetype name, resolved against the archetype table
    pub archetype: String,
    /// Seconds between spawn attempts
    pub interval: f32,
    /// Maximum simultaneously active agents
    pub capacity: u32,
    /// Placement policy
    pub placement: SpawnPlacement,
}

impl Default for SpawnerEntry {
    fn default() -> Self {
        let spawner = SpawnerConfig::default();
        Self {
            archetype: AgentConfig::default().name,
            interval: spawner.interval,
            capacity: spawner.capacity,
            placement: spawner.placement,
        }
    }
}

impl SpawnerEntry {
    /// The spawner settings this entry describes.
    #[must_use]
    pub fn spawner_config(&self) -> SpawnerConfig {
        SpawnerConfig::new(self.interval, self.capacity).with_placement(self.placement.clone())
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run Settings ===
    /// Fixed simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub duration: f32,
    /// Seconds of wall time fed to the accumulator per frame when not
    /// running in real time
    pub frame_time: f32,
    /// Stop the run as soon as the session reaches game over
    pub stop_on_game_over: bool,
    /// Tracing filter directives, comma separated
    pub log_filter: String,

    // === Player Script ===
    /// Where the player is placed and respawns
    pub player_start: Vec2,
    /// Radius of the scripted orbit the player walks
    pub player_orbit_radius: f32,
    /// Angular speed of the scripted orbit, radians per second
    pub player_orbit_speed: f32,

    // === Archetypes ===
    /// Optional RON file with extra archetypes
    pub archetypes_file: Option<PathBuf>,

    // === Simulation ===
    /// World settings
    pub world: WorldConfig,
    /// Player settings
    pub player: PlayerConfig,
    /// Score and lives
    pub session: SessionConfig,
    /// Inline archetypes
    pub archetypes: Vec<AgentConfig>,
    /// Spawners, started together at the beginning of the run
    pub spawners: Vec<SpawnerEntry>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            duration: 60.0,
            frame_time: 1.0 / 30.0,
            stop_on_game_over: true,
            log_filter: "horde=info".to_string(),

            player_start: Vec2::ZERO,
            player_orbit_radius: 6.0,
            player_orbit_speed: 0.3,

            archetypes_file: None,

            world: WorldConfig::default(),
            player: PlayerConfig::default(),
            session: SessionConfig::default(),
            archetypes: vec![AgentConfig::default(), AgentConfig::swarm_circler()],
            spawners: vec![
                SpawnerEntry {
                    archetype: "grunt".to_string(),
                    interval: 5.0,
                    capacity: 10,
                    placement: SpawnPlacement::AroundTarget { radius: 12.0 },
                },
                SpawnerEntry {
                    archetype: "swarmer".to_string(),
                    interval: 3.0,
                    capacity: 6,
                    placement: SpawnPlacement::AroundTarget { radius: 10.0 },
                },
            ],
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match Self::from_toml(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> HordeResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| HordeError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 1000);
        if !self.duration.is_finite() || self.duration < 0.0 {
            self.duration = 0.0;
        }
        if !self.frame_time.is_finite() || self.frame_time <= 0.0 {
            self.frame_time = 1.0 / 30.0;
        }
        self.frame_time = self.frame_time.min(0.25);
        if !self.player_orbit_radius.is_finite() || self.player_orbit_radius < 0.0 {
            self.player_orbit_radius = 0.0;
        }
        if !self.player_orbit_speed.is_finite() {
            self.player_orbit_speed = 0.0;
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = "horde=info".to_string();
        }
    }

    /// Fixed timestep derived from the tick rate.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Builds the archetype table from the inline list plus the optional
    /// RON file. Inline archetypes come first.
    pub fn archetype_table(&self) -> HordeResult<ArchetypeTable> {
        let mut archetypes = self.archetypes.clone();
        if let Some(path) = &self.archetypes_file {
            let source = fs::read_to_string(path)?;
            let table = ArchetypeTable::from_ron(&source)?;
            info!(
                path = %path.display(),
                count = table.archetypes.len(),
                "loaded archetypes"
            );
            archetypes.extend(table.archetypes);
        }
        Ok(ArchetypeTable::from_configs(archetypes)?)
    }
}
