//! Enemy agents.

use horde_common::{AgentId, SpawnerId, Vec2};
use serde::Serialize;

use crate::behavior::{BehaviorState, BehaviorStateMachine, Perception, StateTransition, TickPlan};
use crate::config::AgentConfig;
use crate::steering::{Facing, OrbitTraits, SteeringController};
use crate::vitals::Vitals;

/// A simulated hostile agent.
///
/// Owned by the world. Spawners only keep the handle.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    config: AgentConfig,
    position: Vec2,
    steering: SteeringController,
    behavior: BehaviorStateMachine,
    vitals: Vitals,
    rng: fastrand::Rng,
    spawner: Option<SpawnerId>,
}

impl Agent {
    /// Creates an agent at `position`.
    ///
    /// `rng` becomes the agent's private random stream. The orbit traits are
    /// drawn from it here and never re-rolled.
    #[must_use]
    pub fn spawn(
        id: AgentId,
        config: AgentConfig,
        position: Vec2,
        mut rng: fastrand::Rng,
        spawner: Option<SpawnerId>,
    ) -> Self {
        let config = config.validated();
        let traits = OrbitTraits::roll(&mut rng, config.offset_jitter);
        Self {
            id,
            steering: SteeringController::new(config.move_speed, traits),
            behavior: BehaviorStateMachine::new(config.initial_behavior),
            vitals: Vitals::new(config.max_health, config.shield.as_ref()),
            config,
            position,
            rng,
            spawner,
        }
    }

    /// Handle.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Archetype configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
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

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> BehaviorState {
        self.behavior.state()
    }

    /// Behavior machine.
    #[must_use]
    pub const fn behavior(&self) -> &BehaviorStateMachine {
        &self.behavior
    }

    /// Movement controller.
    #[must_use]
    pub const fn steering(&self) -> &SteeringController {
        &self.steering
    }

    /// Health and shield.
    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Spawner that created this agent, if any.
    #[must_use]
    pub const fn spawner(&self) -> Option<SpawnerId> {
        self.spawner
    }

    /// Whether the agent is not dead.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.behavior.state() != BehaviorState::Dead
    }

    /// Read-only snapshot for the presentation layer.
    #[must_use]
    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            position: self.position,
            velocity: self.velocity(),
            state: self.state(),
            facing_sign: self.facing().sign(),
            health: self.vitals.health().current(),
            shield: self.vitals.shield().map(|s| s.current()),
        }
    }

    pub(crate) fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    pub(crate) fn plan(&mut self, perception: &Perception, now: f64) -> TickPlan {
        self.behavior.evaluate(
            &self.config,
            &mut self.steering,
            &mut self.rng,
            perception,
            now,
        )
    }

    pub(crate) fn handle_death(&mut self, now: f64) -> Option<StateTransition> {
        self.behavior.handle_death(&mut self.steering, now)
    }

    pub(crate) fn ready_for_removal(&self, now: f64) -> bool {
        self.behavior.ready_for_removal(now, self.config.removal_delay)
    }

    pub(crate) fn integrate(&mut self, dt: f32) {
        self.position += self.steering.velocity() * dt;
    }
}

/// Per-agent state exposed to presentation and animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentView {
    /// Handle
    pub id: AgentId,
    /// Position
    pub position: Vec2,
    /// Velocity, for animation selection
    pub velocity: Vec2,
    /// Behavior state
    pub state: BehaviorState,
    /// +1 facing right, -1 facing left
    pub facing_sign: f32,
    /// Current health
    pub health: f32,
    /// Current shield, if any
    pub shield: Option<f32>,
}
