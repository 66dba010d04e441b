//! Configuration surface for agents, the player, spawners and the world.
//!
//! Every struct here is constructed once and treated as immutable by the
//! agents built from it. Out-of-range values are clamped (with a warning)
//! by the `validated` constructors so that per-tick code never has to
//! re-check them.

use horde_common::{ConfigError, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default detection range in world units.
pub const DEFAULT_DETECTION_RANGE: f32 = 10.0;
/// Default attack range in world units.
pub const DEFAULT_ATTACK_RANGE: f32 = 2.0;
/// Default seconds between attacks.
pub const DEFAULT_ATTACK_COOLDOWN: f32 = 1.0;
/// Default damage per attack.
pub const DEFAULT_ATTACK_DAMAGE: f32 = 10.0;
/// Default damage dealt when an enemy comes into contact with the player.
pub const DEFAULT_CONTACT_DAMAGE: f32 = 5.0;
/// Default movement speed in units per second.
pub const DEFAULT_MOVE_SPEED: f32 = 2.0;
/// Default patrol waypoint radius.
pub const DEFAULT_PATROL_RANGE: f32 = 5.0;
/// Default distance at which a waypoint counts as reached.
pub const DEFAULT_ARRIVE_THRESHOLD: f32 = 0.1;
/// Default maximum health.
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;
/// Default delay between death and removal, in seconds.
pub const DEFAULT_REMOVAL_DELAY: f32 = 2.0;
/// Smallest spawn interval accepted; shorter intervals are raised to this.
pub const MIN_SPAWN_INTERVAL: f32 = 0.01;

/// Capability tag selecting how an enemy chases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnemyVariant {
    /// Closes straight in on the target
    #[default]
    Melee,
    /// Orbits the target at close range and keeps apart from its pack
    SwarmCircler,
}

impl EnemyVariant {
    /// Get display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Melee => "Melee",
            Self::SwarmCircler => "Swarm Circler",
        }
    }

    /// Whether this variant blends a separation force into its movement.
    #[must_use]
    pub const fn separates(self) -> bool {
        matches!(self, Self::SwarmCircler)
    }

    /// Whether this variant orbits the target instead of closing in.
    #[must_use]
    pub const fn orbits(self) -> bool {
        matches!(self, Self::SwarmCircler)
    }
}

/// State an agent falls back to after losing its target while chasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LostTargetPolicy {
    /// Pick a fresh patrol waypoint and wander
    #[default]
    Patrol,
    /// Stand still until the target is seen again
    Idle,
}

/// State a freshly spawned agent starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitialBehavior {
    /// Stand still
    Idle,
    /// Wander between random waypoints
    #[default]
    Patrol,
}

/// Shield layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Maximum shield value
    pub max: f32,
    /// Seconds without damage before recharge starts
    pub recharge_delay: f32,
    /// Shield regained per second while recharging
    pub recharge_rate: f32,
    /// Whether recharge runs at all
    pub recharge_enabled: bool,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            max: 50.0,
            recharge_delay: 5.0,
            recharge_rate: 10.0,
            recharge_enabled: true,
        }
    }
}

impl ShieldConfig {
    /// Returns a copy with every field clamped into its valid range.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.max = non_negative("shield.max", self.max);
        self.recharge_delay = non_negative("shield.recharge_delay", self.recharge_delay);
        self.recharge_rate = non_negative("shield.recharge_rate", self.recharge_rate);
        self
    }
}

/// Per-archetype enemy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Archetype name used by spawner tables
    pub name: String,
    /// Chase strategy
    pub variant: EnemyVariant,
    /// Range at which the target is noticed
    pub detection_range: f32,
    /// Range at which attacks are made
    pub attack_range: f32,
    /// Seconds between attacks
    pub attack_cooldown: f32,
    /// Damage per attack
    pub attack_damage: f32,
    /// Damage dealt each time the agent comes into contact with the player
    pub contact_damage: f32,
    /// Movement speed in units per second
    pub move_speed: f32,
    /// Radius of the disk patrol waypoints are drawn from
    pub patrol_range: f32,
    /// Distance at which a waypoint counts as reached
    pub arrive_threshold: f32,
    /// Strength of the tangential orbit term
    pub circling_speed: f32,
    /// Distance from the target the orbit point is placed at
    pub circling_radius: f32,
    /// Orbiting variants start circling inside this distance
    pub circling_engage_range: f32,
    /// Radius searched for neighbours to keep apart from
    pub separation_radius: f32,
    /// Weight of the separation repulsion
    pub separation_strength: f32,
    /// Floor applied to neighbour distances in the 1/d repulsion
    pub min_separation_distance: f32,
    /// Spread of the per-agent orbit multiplier around 1.0
    pub offset_jitter: f32,
    /// Maximum health
    pub max_health: f32,
    /// Optional shield layer
    pub shield: Option<ShieldConfig>,
    /// Starting state
    pub initial_behavior: InitialBehavior,
    /// Fallback when the target is lost while chasing
    pub lost_target_policy: LostTargetPolicy,
    /// Seconds between death and removal from the world
    pub removal_delay: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "grunt".to_string(),
            variant: EnemyVariant::Melee,
            detection_range: DEFAULT_DETECTION_RANGE,
            attack_range: DEFAULT_ATTACK_RANGE,
            attack_cooldown: DEFAULT_ATTACK_COOLDOWN,
            attack_damage: DEFAULT_ATTACK_DAMAGE,
            contact_damage: DEFAULT_CONTACT_DAMAGE,
            move_speed: DEFAULT_MOVE_SPEED,
            patrol_range: DEFAULT_PATROL_RANGE,
            arrive_threshold: DEFAULT_ARRIVE_THRESHOLD,
            circling_speed: 1.0,
            circling_radius: 1.5,
            circling_engage_range: 4.0,
            separation_radius: 1.0,
            separation_strength: 2.0,
            min_separation_distance: 0.1,
            offset_jitter: 0.2,
            max_health: DEFAULT_MAX_HEALTH,
            shield: None,
            initial_behavior: InitialBehavior::Patrol,
            lost_target_policy: LostTargetPolicy::Patrol,
            removal_delay: DEFAULT_REMOVAL_DELAY,
        }
    }
}

impl AgentConfig {
    /// Creates a default config for the given archetype name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Preset for the orbiting swarm enemy.
    #[must_use]
    pub fn swarm_circler() -> Self {
        Self {
            name: "swarmer".to_string(),
            variant: EnemyVariant::SwarmCircler,
            move_speed: 3.0,
            max_health: 40.0,
            attack_damage: 5.0,
            ..Default::default()
        }
    }

    /// Sets the chase variant.
    #[must_use]
    pub fn with_variant(mut self, variant: EnemyVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets detection and attack ranges.
    #[must_use]
    pub fn with_ranges(mut self, detection: f32, attack: f32) -> Self {
        self.detection_range = detection;
        self.attack_range = attack;
        self
    }

    /// Sets attack cooldown and damage.
    #[must_use]
    pub fn with_attack(mut self, cooldown: f32, damage: f32) -> Self {
        self.attack_cooldown = cooldown;
        self.attack_damage = damage;
        self
    }

    /// Sets contact damage. Zero disables it.
    #[must_use]
    pub fn with_contact_damage(mut self, damage: f32) -> Self {
        self.contact_damage = damage;
        self
    }

    /// Sets movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Sets maximum health.
    #[must_use]
    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Attaches a shield layer.
    #[must_use]
    pub fn with_shield(mut self, shield: ShieldConfig) -> Self {
        self.shield = Some(shield);
        self
    }

    /// Sets the starting state.
    #[must_use]
    pub fn with_initial_behavior(mut self, initial: InitialBehavior) -> Self {
        self.initial_behavior = initial;
        self
    }

    /// Sets the lost-target fallback.
    #[must_use]
    pub fn with_lost_target_policy(mut self, policy: LostTargetPolicy) -> Self {
        self.lost_target_policy = policy;
        self
    }

    /// Sets the death-to-removal delay.
    #[must_use]
    pub fn with_removal_delay(mut self, delay: f32) -> Self {
        self.removal_delay = delay;
        self
    }

    /// Returns a copy with every field clamped into its valid range.
    ///
    /// A detection range shorter than the attack range is raised to match,
    /// otherwise the agent could never leave Patrol to reach Attack.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.attack_range = non_negative("attack_range", self.attack_range);
        self.detection_range = non_negative("detection_range", self.detection_range);
        if self.detection_range < self.attack_range {
            warn!(
                archetype = %self.name,
                detection = self.detection_range,
                attack = self.attack_range,
                "detection_range below attack_range, raising it"
            );
            self.detection_range = self.attack_range;
        }
        self.attack_cooldown = non_negative("attack_cooldown", self.attack_cooldown);
        self.attack_damage = non_negative("attack_damage", self.attack_damage);
        self.contact_damage = non_negative("contact_damage", self.contact_damage);
        self.move_speed = non_negative("move_speed", self.move_speed);
        self.patrol_range = non_negative("patrol_range", self.patrol_range);
        self.arrive_threshold = non_negative("arrive_threshold", self.arrive_threshold);
        self.circling_speed = non_negative("circling_speed", self.circling_speed);
        self.circling_radius = non_negative("circling_radius", self.circling_radius);
        self.circling_engage_range =
            non_negative("circling_engage_range", self.circling_engage_range);
        self.separation_radius = non_negative("separation_radius", self.separation_radius);
        self.separation_strength = non_negative("separation_strength", self.separation_strength);
        self.min_separation_distance =
            non_negative("min_separation_distance", self.min_separation_distance)
                .max(f32::EPSILON);
        self.offset_jitter = non_negative("offset_jitter", self.offset_jitter).min(1.0);
        self.max_health = at_least_one("max_health", self.max_health);
        self.shield = self.shield.map(ShieldConfig::validated);
        self.removal_delay = non_negative("removal_delay", self.removal_delay);
        self
    }
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Movement speed in units per second
    pub move_speed: f32,
    /// Maximum health
    pub max_health: f32,
    /// Optional shield layer
    pub shield: Option<ShieldConfig>,
    /// Radius of the area attack
    pub attack_range: f32,
    /// Damage dealt to every enemy in range
    pub attack_damage: f32,
    /// Seconds between area attacks
    pub fire_rate: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            max_health: DEFAULT_MAX_HEALTH,
            shield: Some(ShieldConfig::default()),
            attack_range: 3.0,
            attack_damage: 10.0,
            fire_rate: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Returns a copy with every field clamped into its valid range.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.move_speed = non_negative("player.move_speed", self.move_speed);
        self.max_health = at_least_one("player.max_health", self.max_health);
        self.shield = self.shield.map(ShieldConfig::validated);
        self.attack_range = non_negative("player.attack_range", self.attack_range);
        self.attack_damage = non_negative("player.attack_damage", self.attack_damage);
        self.fire_rate = non_negative("player.fire_rate", self.fire_rate);
        self
    }
}

/// Where a spawner places new agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnPlacement {
    /// One of a fixed set of points, chosen uniformly
    FixedPoints(Vec<Vec2>),
    /// A random point on the circle of `radius` around the target.
    ///
    /// Spawns always land on the circle itself, never inside the disk, so
    /// new enemies keep a fixed distance from the target.
    AroundTarget {
        /// Distance from the target
        radius: f32,
    },
}

impl Default for SpawnPlacement {
    fn default() -> Self {
        Self::AroundTarget { radius: 12.0 }
    }
}

/// Population spawner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Seconds between spawn attempts
    pub interval: f32,
    /// Maximum simultaneously active agents
    pub capacity: u32,
    /// Placement policy
    pub placement: SpawnPlacement,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            interval: 5.0,
            capacity: 10,
            placement: SpawnPlacement::default(),
        }
    }
}

impl SpawnerConfig {
    /// Creates a spawner config with the given interval and capacity.
    #[must_use]
    pub fn new(interval: f32, capacity: u32) -> Self {
        Self {
            interval,
            capacity,
            ..Default::default()
        }
    }

    /// Sets the placement policy.
    #[must_use]
    pub fn with_placement(mut self, placement: SpawnPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Checks the settings that disable a spawner outright.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        match &self.placement {
            SpawnPlacement::FixedPoints(points) if points.is_empty() => {
                Err(ConfigError::NoSpawnPoints)
            },
            SpawnPlacement::AroundTarget { radius } if !radius.is_finite() || *radius < 0.0 => {
                Err(ConfigError::InvalidSpawnRadius(*radius))
            },
            _ => Ok(()),
        }
    }

    /// Spawn interval raised to the accepted minimum.
    #[must_use]
    pub fn effective_interval(&self) -> f32 {
        if self.interval.is_finite() && self.interval >= MIN_SPAWN_INTERVAL {
            self.interval
        } else {
            MIN_SPAWN_INTERVAL
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for every random draw in the world
    pub seed: u64,
    /// Cell size of the spatial grid
    pub spatial_cell_size: f32,
    /// Capacity of the event channel
    pub event_capacity: usize,
    /// Distance at which an enemy touches the player
    pub contact_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            spatial_cell_size: 4.0,
            event_capacity: 4096,
            contact_radius: 0.5,
        }
    }
}

impl WorldConfig {
    /// Creates a default config with the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

/// Named set of enemy archetypes, typically loaded from RON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeTable {
    /// Archetype definitions
    pub archetypes: Vec<AgentConfig>,
}

impl ArchetypeTable {
    /// Parses a RON document of the form `(archetypes: [ ... ])`.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let table: Self = ron::from_str(source).map_err(|e| ConfigError::Parse {
            format: "ron",
            message: e.to_string(),
        })?;
        table.check_unique()?;
        Ok(table)
    }

    /// Builds a table from already-constructed configs.
    pub fn from_configs(archetypes: Vec<AgentConfig>) -> Result<Self, ConfigError> {
        let table = Self { archetypes };
        table.check_unique()?;
        Ok(table)
    }

    /// Looks up an archetype by name.
    pub fn get(&self, name: &str) -> Result<&AgentConfig, ConfigError> {
        self.archetypes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigError::UnknownArchetype(name.to_string()))
    }

    fn check_unique(&self) -> Result<(), ConfigError> {
        for (i, a) in self.archetypes.iter().enumerate() {
            if self.archetypes[..i].iter().any(|b| b.name == a.name) {
                return Err(ConfigError::DuplicateArchetype(a.name.clone()));
            }
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, "clamping invalid config value to 0");
        0.0
    }
}

fn at_least_one(field: &'static str, value: f32) -> f32 {
    if value.is_finite() && value >= 1.0 {
        value
    } else {
        warn!(field, value, "clamping invalid config value to 1");
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.detection_range, 10.0);
        assert_eq!(config.attack_range, 2.0);
        assert_eq!(config.attack_cooldown, 1.0);
        assert_eq!(config.variant, EnemyVariant::Melee);
        assert_eq!(config.contact_damage, DEFAULT_CONTACT_DAMAGE);
        assert!(config.shield.is_none());
    }

    #[test]
    fn test_validated_clamps_negatives() {
        let config = AgentConfig::default()
            .with_speed(-3.0)
            .with_attack(-1.0, -5.0)
            .with_max_health(0.0)
            .with_contact_damage(-2.0)
            .validated();
        assert_eq!(config.move_speed, 0.0);
        assert_eq!(config.attack_cooldown, 0.0);
        assert_eq!(config.attack_damage, 0.0);
        assert_eq!(config.max_health, 1.0);
        assert_eq!(config.contact_damage, 0.0);
    }

    #[test]
    fn test_validated_raises_detection_to_attack_range() {
        let config = AgentConfig::default().with_ranges(1.0, 3.0).validated();
        assert_eq!(config.detection_range, 3.0);
    }

    #[test]
    fn test_validated_rejects_nan() {
        let config = AgentConfig::default().with_ranges(f32::NAN, 2.0).validated();
        assert_eq!(config.detection_range, 2.0);
    }

    #[test]
    fn test_variant_capabilities() {
        assert!(!EnemyVariant::Melee.separates());
        assert!(!EnemyVariant::Melee.orbits());
        assert!(EnemyVariant::SwarmCircler.separates());
        assert!(EnemyVariant::SwarmCircler.orbits());
    }

    #[test]
    fn test_spawner_validate() {
        assert!(SpawnerConfig::new(2.0, 3).validate().is_ok());
        assert_eq!(
            SpawnerConfig::new(2.0, 0).validate(),
            Err(ConfigError::ZeroCapacity)
        );
        let no_points =
            SpawnerConfig::new(2.0, 3).with_placement(SpawnPlacement::FixedPoints(Vec::new()));
        assert_eq!(no_points.validate(), Err(ConfigError::NoSpawnPoints));
        let bad_radius = SpawnerConfig::new(2.0, 3)
            .with_placement(SpawnPlacement::AroundTarget { radius: -1.0 });
        assert_eq!(
            bad_radius.validate(),
            Err(ConfigError::InvalidSpawnRadius(-1.0))
        );
    }

    #[test]
    fn test_effective_interval() {
        assert_eq!(SpawnerConfig::new(2.0, 1).effective_interval(), 2.0);
        assert_eq!(
            SpawnerConfig::new(-1.0, 1).effective_interval(),
            MIN_SPAWN_INTERVAL
        );
        assert_eq!(
            SpawnerConfig::new(f32::INFINITY, 1).effective_interval(),
            MIN_SPAWN_INTERVAL
        );
    }

    #[test]
    fn test_archetype_table_from_ron() {
        let source = r#"(
            archetypes: [
                (name: "grunt", attack_damage: 12.0),
                (name: "swarmer", variant: SwarmCircler, move_speed: 3.5,
                 shield: Some((max: 20.0))),
            ],
        )"#;
        let table = ArchetypeTable::from_ron(source).expect("valid ron");
        assert_eq!(table.archetypes.len(), 2);
        let grunt = table.get("grunt").expect("grunt exists");
        assert_eq!(grunt.attack_damage, 12.0);
        assert_eq!(grunt.detection_range, DEFAULT_DETECTION_RANGE);
        let swarmer = table.get("swarmer").expect("swarmer exists");
        assert_eq!(swarmer.variant, EnemyVariant::SwarmCircler);
        let shield = swarmer.shield.as_ref().expect("shield present");
        assert_eq!(shield.max, 20.0);
        assert_eq!(shield.recharge_delay, 5.0);
        assert!(matches!(
            table.get("boss"),
            Err(ConfigError::UnknownArchetype(_))
        ));
    }

    #[test]
    fn test_archetype_table_rejects_duplicates() {
        let result = ArchetypeTable::from_configs(vec![
            AgentConfig::named("a"),
            AgentConfig::named("a"),
        ]);
        assert_eq!(result, Err(ConfigError::DuplicateArchetype("a".to_string())));
    }

    #[test]
    fn test_archetype_table_parse_error() {
        let result = ArchetypeTable::from_ron("(archetypes: [");
        assert!(matches!(result, Err(ConfigError::Parse { format: "ron", .. })));
    }
}
