//! Population spawner: rate-limited, capacity-bounded agent creation.
//!
//! A spawner never owns agents. It decides *when* and *where* one should
//! appear and keeps a roster of live handles for population accounting.
//! The world performs the actual creation and feeds deaths back through
//! [`PopulationSpawner::on_agent_died`].

use std::collections::BTreeSet;

use horde_common::math::random_on_circle;
use horde_common::{AgentId, ConfigError, SpawnerId, Vec2};
use tracing::{debug, error, info};

use crate::config::{SpawnPlacement, SpawnerConfig};

/// A spawn the world should perform at the end of the tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    /// Requesting spawner
    pub spawner: SpawnerId,
    /// Where to place the agent
    pub position: Vec2,
}

/// Spawner state.
#[derive(Debug, Clone)]
pub struct PopulationSpawner {
    id: SpawnerId,
    archetype: String,
    config: SpawnerConfig,
    interval: f32,
    roster: BTreeSet<AgentId>,
    timer: f32,
    running: bool,
    disabled: Option<ConfigError>,
    rng: fastrand::Rng,
}

impl PopulationSpawner {
    /// Creates a stopped spawner for `archetype`.
    ///
    /// An invalid configuration is reported once here and leaves the
    /// spawner permanently disabled; it never affects other spawners.
    pub fn new(
        id: SpawnerId,
        archetype: impl Into<String>,
        config: SpawnerConfig,
        rng: fastrand::Rng,
    ) -> Self {
        let archetype = archetype.into();
        let disabled = config.validate().err();
        if let Some(err) = &disabled {
            error!(spawner = %id, archetype = %archetype, %err, "spawner disabled");
        }
        Self {
            id,
            archetype,
            interval: config.effective_interval(),
            config,
            roster: BTreeSet::new(),
            timer: 0.0,
            running: false,
            disabled,
            rng,
        }
    }

    /// Spawner handle.
    #[must_use]
    pub const fn id(&self) -> SpawnerId {
        self.id
    }

    /// Name of the archetype this spawner creates.
    #[must_use]
    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    /// Configuration as given.
    #[must_use]
    pub const fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Maximum simultaneously live agents.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.config.capacity
    }

    /// Live agents currently on the roster.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.roster.len()
    }

    /// Roster handles in ascending order.
    pub fn roster(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.roster.iter().copied()
    }

    /// Whether `agent` is on the roster.
    #[must_use]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.roster.contains(&agent)
    }

    /// Whether the spawner is ticking.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Setup error that disabled this spawner, if any.
    #[must_use]
    pub const fn disabled_reason(&self) -> Option<&ConfigError> {
        self.disabled.as_ref()
    }

    /// Starts ticking. Returns `false` if already running or disabled.
    pub fn start(&mut self) -> bool {
        if self.running || self.disabled.is_some() {
            return false;
        }
        self.running = true;
        info!(spawner = %self.id, archetype = %self.archetype, "spawner started");
        true
    }

    /// Stops ticking. The roster is kept. Returns `false` if not running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!(spawner = %self.id, "spawner stopped");
        true
    }

    /// Advances the interval timer.
    ///
    /// When it runs out, the timer is reset and one spawn is attempted.
    /// The attempt is dropped (not queued) when the roster is full or when
    /// placement needs a target that is absent.
    pub fn tick(&mut self, dt: f32, target: Option<Vec2>) -> Option<SpawnRequest> {
        if !self.running {
            return None;
        }
        self.timer -= dt.max(0.0);
        if self.timer > 0.0 {
            return None;
        }
        self.timer = self.interval;

        if self.is_full() {
            debug!(spawner = %self.id, active = self.roster.len(), "at capacity, spawn dropped");
            return None;
        }
        let position = self.pick_position(target)?;
        Some(SpawnRequest {
            spawner: self.id,
            position,
        })
    }

    /// Adds a freshly created agent to the roster. Returns `false` (and
    /// leaves the roster untouched) if that would exceed capacity.
    pub fn admit(&mut self, agent: AgentId) -> bool {
        if self.is_full() {
            return false;
        }
        self.roster.insert(agent)
    }

    /// Death notification. Returns whether the agent was on the roster;
    /// repeated notifications are no-ops.
    pub fn on_agent_died(&mut self, agent: AgentId) -> bool {
        let removed = self.roster.remove(&agent);
        if removed {
            debug!(spawner = %self.id, %agent, active = self.roster.len(), "roster shrank");
        }
        removed
    }

    /// Empties the roster, returning every handle that was on it.
    ///
    /// The caller destroys those agents without raising death
    /// notifications, so they are never counted as kills.
    pub fn clear(&mut self) -> Vec<AgentId> {
        let cleared: Vec<AgentId> = std::mem::take(&mut self.roster).into_iter().collect();
        info!(spawner = %self.id, count = cleared.len(), "spawner cleared");
        cleared
    }

    fn is_full(&self) -> bool {
        self.roster.len() >= self.config.capacity as usize
    }

    fn pick_position(&mut self, target: Option<Vec2>) -> Option<Vec2> {
        match &self.config.placement {
            SpawnPlacement::FixedPoints(points) => {
                if points.is_empty() {
                    return None;
                }
                Some(points[self.rng.usize(..points.len())])
            },
            SpawnPlacement::AroundTarget { radius } => {
                let Some(center) = target else {
                    debug!(spawner = %self.id, "no target to spawn around, spawn dropped");
                    return None;
                };
                Some(random_on_circle(&mut self.rng, center, *radius))
            },
        }
    }
}
