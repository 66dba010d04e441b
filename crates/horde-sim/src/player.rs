//! The tracked target.
//!
//! The player is placed explicitly rather than spawned. It moves by direct
//! input (`move_in_direction` / `stop_movement`), takes damage through the
//! same pipeline as enemies, and fires an area attack on a fixed cooldown.

use horde_common::{AgentId, Vec2};

use crate::config::PlayerConfig;
use crate::steering::{Facing, OrbitTraits, SteeringController};
use crate::vitals::Vitals;

/// Player agent.
#[derive(Debug, Clone)]
pub struct Player {
    id: AgentId,
    config: PlayerConfig,
    position: Vec2,
    steering: SteeringController,
    vitals: Vitals,
    last_attack_time: Option<f64>,
}

impl Player {
    /// Places a player at `position` with full vitals.
    #[must_use]
    pub fn new(id: AgentId, config: PlayerConfig, position: Vec2) -> Self {
        let config = config.validated();
        Self {
            id,
            steering: SteeringController::new(config.move_speed, OrbitTraits::default()),
            vitals: Vitals::new(config.max_health, config.shield.as_ref()),
            config,
            position,
            last_attack_time: None,
        }
    }

    /// Handle.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.steering.velocity()
    }

    /// Current facing.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.steering.facing()
    }

    /// Health and shield.
    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Whether the player is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.vitals.is_dead()
    }

    /// Moves along `direction` at the configured speed. Ignored while dead.
    pub fn move_in_direction(&mut self, direction: Vec2) {
        if self.is_alive() {
            self.steering.move_in_direction(direction);
        }
    }

    /// Stops moving.
    pub fn stop_movement(&mut self) {
        self.steering.stop_movement();
    }

    /// Changes movement speed.
    pub fn set_speed(&mut self, speed: f32) {
        self.steering.set_speed(speed);
    }

    /// Teleports the player.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Whether the area attack is off cooldown at `now`.
    #[must_use]
    pub fn attack_ready(&self, now: f64) -> bool {
        self.is_alive()
            && self
                .last_attack_time
                .map_or(true, |last| now >= last + f64::from(self.config.fire_rate))
    }

    pub(crate) fn record_attack(&mut self, now: f64) {
        self.last_attack_time = Some(now);
    }

    pub(crate) fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    pub(crate) fn integrate(&mut self, dt: f32) {
        self.position += self.steering.velocity() * dt;
    }

    /// Restores full vitals at `position` after a death.
    pub(crate) fn respawn(&mut self, position: Vec2) {
        self.vitals = Vitals::new(self.config.max_health, self.config.shield.as_ref());
        self.position = position;
        self.steering.stop_movement();
        self.last_attack_time = None;
    }
}
