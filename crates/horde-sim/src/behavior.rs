//! Per-agent behavior state machine.
//!
//! The machine is evaluated once per tick against a [`Perception`] built
//! from the start-of-tick snapshot. It makes at most one transition per
//! evaluation, runs the entry action of the state it enters, and hands any
//! attack back to the caller as an [`AttackCommand`] instead of applying it,
//! so damage lands only after every agent has decided.

use horde_common::{AgentId, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::config::{AgentConfig, InitialBehavior, LostTargetPolicy};
use crate::steering::{self, CircleParams, SteeringController};

/// Behavior states. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    /// Standing still
    Idle,
    /// Wandering between random waypoints
    Patrol,
    /// Moving toward the target
    Chase,
    /// In range and attacking on cooldown
    Attack,
    /// Killed, waiting for removal
    Dead,
}

impl BehaviorState {
    /// Whether this state requires an acquired target.
    #[must_use]
    pub const fn needs_target(self) -> bool {
        matches!(self, Self::Chase | Self::Attack)
    }

    /// Get display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Patrol => "Patrol",
            Self::Chase => "Chase",
            Self::Attack => "Attack",
            Self::Dead => "Dead",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<InitialBehavior> for BehaviorState {
    fn from(initial: InitialBehavior) -> Self {
        match initial {
            InitialBehavior::Idle => Self::Idle,
            InitialBehavior::Patrol => Self::Patrol,
        }
    }
}

impl From<LostTargetPolicy> for BehaviorState {
    fn from(policy: LostTargetPolicy) -> Self {
        match policy {
            LostTargetPolicy::Patrol => Self::Patrol,
            LostTargetPolicy::Idle => Self::Idle,
        }
    }
}

/// A state change, observable for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state
    pub from: BehaviorState,
    /// New state
    pub to: BehaviorState,
}

/// Target as seen in the start-of-tick snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    /// Target handle
    pub id: AgentId,
    /// Target position
    pub position: Vec2,
}

/// Everything an agent reads during one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    /// Own position
    pub position: Vec2,
    /// Target, if one is currently available
    pub target: Option<TargetView>,
    /// Unit separation force from nearby agents, or zero
    pub separation: Vec2,
}

impl Perception {
    /// Distance to the target, if any.
    #[must_use]
    pub fn target_distance(&self) -> Option<f32> {
        self.target.map(|t| self.position.distance(t.position))
    }
}

/// Damage an agent wants to deal this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackCommand {
    /// Victim
    pub target: AgentId,
    /// Damage before mitigation
    pub amount: f32,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickPlan {
    /// Transition taken this tick, if any
    pub transition: Option<StateTransition>,
    /// Attack issued this tick, if any
    pub attack: Option<AttackCommand>,
}

/// Behavior state plus the timers it polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorStateMachine {
    state: BehaviorState,
    waypoint: Option<Vec2>,
    last_attack_time: Option<f64>,
    died_at: Option<f64>,
}

impl BehaviorStateMachine {
    /// Creates a machine in the configured starting state.
    #[must_use]
    pub fn new(initial: InitialBehavior) -> Self {
        Self {
            state: initial.into(),
            waypoint: None,
            last_attack_time: None,
            died_at: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BehaviorState {
        self.state
    }

    /// Current patrol waypoint, if one has been chosen.
    #[must_use]
    pub const fn waypoint(&self) -> Option<Vec2> {
        self.waypoint
    }

    /// Time of the last attack, if any.
    #[must_use]
    pub const fn last_attack_time(&self) -> Option<f64> {
        self.last_attack_time
    }

    /// Time of death, if dead.
    #[must_use]
    pub const fn died_at(&self) -> Option<f64> {
        self.died_at
    }

    /// Whether the attack cooldown has elapsed at `now`.
    #[must_use]
    pub fn cooldown_ready(&self, now: f64, cooldown: f32) -> bool {
        self.last_attack_time
            .map_or(true, |last| now >= last + f64::from(cooldown))
    }

    /// Runs one tick of decision making.
    pub fn evaluate(
        &mut self,
        config: &AgentConfig,
        steering: &mut SteeringController,
        rng: &mut fastrand::Rng,
        perception: &Perception,
        now: f64,
    ) -> TickPlan {
        let distance = perception.target_distance();
        let in_detection = distance.is_some_and(|d| d <= config.detection_range);
        let lost_state = BehaviorState::from(config.lost_target_policy);

        let next = match self.state {
            BehaviorState::Dead => {
                steering.stop_movement();
                return TickPlan::default();
            },
            BehaviorState::Idle | BehaviorState::Patrol if in_detection => {
                Some(BehaviorState::Chase)
            },
            BehaviorState::Idle | BehaviorState::Patrol => None,
            BehaviorState::Chase => match distance {
                Some(d) if d <= config.attack_range => Some(BehaviorState::Attack),
                Some(d) if d <= config.detection_range => None,
                _ => Some(lost_state),
            },
            BehaviorState::Attack => match distance {
                None => Some(lost_state),
                Some(d) if d > config.attack_range => Some(BehaviorState::Chase),
                Some(_) => None,
            },
        };

        let mut plan = TickPlan::default();
        if let Some(to) = next {
            let transition = self.enter(to);
            self.on_enter(config, steering, rng, perception);
            plan.transition = Some(transition);
            return plan;
        }

        match self.state {
            BehaviorState::Idle => steering.stop_movement(),
            BehaviorState::Patrol => self.patrol(config, steering, rng, perception),
            BehaviorState::Chase => chase(config, steering, perception),
            BehaviorState::Attack => {
                steering.stop_movement();
                if let Some(target) = perception.target {
                    if self.cooldown_ready(now, config.attack_cooldown) {
                        self.last_attack_time = Some(now);
                        plan.attack = Some(AttackCommand {
                            target: target.id,
                            amount: config.attack_damage,
                        });
                    }
                }
            },
            BehaviorState::Dead => {},
        }
        plan
    }

    /// Forces the transition to `Dead` on the agent's own death
    /// notification. Returns `None` if already dead.
    pub fn handle_death(
        &mut self,
        steering: &mut SteeringController,
        now: f64,
    ) -> Option<StateTransition> {
        if self.state == BehaviorState::Dead {
            return None;
        }
        let transition = self.enter(BehaviorState::Dead);
        self.died_at = Some(now);
        self.waypoint = None;
        steering.stop_movement();
        Some(transition)
    }

    /// Whether the removal delay after death has elapsed.
    #[must_use]
    pub fn ready_for_removal(&self, now: f64, removal_delay: f32) -> bool {
        self.died_at
            .is_some_and(|t| now - t >= f64::from(removal_delay))
    }

    fn enter(&mut self, to: BehaviorState) -> StateTransition {
        let transition = StateTransition {
            from: self.state,
            to,
        };
        debug!(from = %transition.from, to = %transition.to, "behavior transition");
        self.state = to;
        transition
    }

    fn on_enter(
        &mut self,
        config: &AgentConfig,
        steering: &mut SteeringController,
        rng: &mut fastrand::Rng,
        perception: &Perception,
    ) {
        match self.state {
            BehaviorState::Idle | BehaviorState::Attack | BehaviorState::Dead => {
                steering.stop_movement();
            },
            BehaviorState::Patrol => {
                self.waypoint = Some(steering::patrol_waypoint(
                    rng,
                    perception.position,
                    config.patrol_range,
                ));
                self.patrol(config, steering, rng, perception);
            },
            BehaviorState::Chase => chase(config, steering, perception),
        }
    }

    fn patrol(
        &mut self,
        config: &AgentConfig,
        steering: &mut SteeringController,
        rng: &mut fastrand::Rng,
        perception: &Perception,
    ) {
        let position = perception.position;
        let waypoint = match self.waypoint {
            Some(w) if !steering::is_at_target(position, w, config.arrive_threshold) => w,
            _ => {
                let w = steering::patrol_waypoint(rng, position, config.patrol_range);
                trace!(x = w.x, y = w.y, "new patrol waypoint");
                self.waypoint = Some(w);
                w
            },
        };
        if steering::is_at_target(position, waypoint, config.arrive_threshold) {
            steering.stop_movement();
        } else {
            steering.steer_toward(position, waypoint, separation_for(config, perception));
        }
    }
}

fn separation_for(config: &AgentConfig, perception: &Perception) -> Vec2 {
    if config.variant.separates() {
        perception.separation
    } else {
        Vec2::ZERO
    }
}

fn chase(config: &AgentConfig, steering: &mut SteeringController, perception: &Perception) {
    let Some(target) = perception.target else {
        steering.stop_movement();
        return;
    };
    let separation = separation_for(config, perception);
    let distance = perception.position.distance(target.position);
    if config.variant.orbits() && distance <= config.circling_engage_range {
        let params = CircleParams {
            radius: config.circling_radius,
            speed: config.circling_speed,
        };
        steering.steer_around(perception.position, target.position, params, separation);
    } else {
        steering.steer_toward(perception.position, target.position, separation);
    }
    trace!(vx = steering.velocity().x, vy = steering.velocity().y, "chase steering");
}
