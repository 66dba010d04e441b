//! The simulation world and its per-tick pass.
//!
//! One call to [`World::tick`] runs these phases in order:
//!
//! 1. advance the clock
//! 2. snapshot living positions and the target, build the spatial grid
//! 3. every living enemy decides from the snapshot (transitions, steering,
//!    attack commands)
//! 4. the player's area attack picks its victims from the snapshot
//! 5. enemies that newly touch the player queue contact damage
//! 6. positions integrate
//! 7. queued damage is applied in `(target, source)` order; deaths force
//!    `Dead` and notify the owning spawner
//! 8. shields recharge
//! 9. dead agents whose removal delay elapsed are released
//! 10. spawners tick and new agents are created
//! 11. buffered events are published to the bus
//!
//! Decisions never see effects from the same tick, so the iteration order of
//! agents cannot change the outcome.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use horde_common::{AgentId, AgentIdAllocator, SimClock, SpawnerId, Vec2};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::agent::{Agent, AgentView};
use crate::behavior::{BehaviorState, Perception, TargetView};
use crate::config::{AgentConfig, PlayerConfig, SpawnerConfig, WorldConfig};
use crate::events::{EventBus, SimEvent};
use crate::player::Player;
use crate::spatial::{SpatialGrid, SpatialQuery};
use crate::spawner::PopulationSpawner;
use crate::steering;
use crate::vitals::{DamageOutcome, Vitals};

/// Errors from setup-level world calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// No spawner with this id
    #[error("unknown spawner: {0}")]
    UnknownSpawner(SpawnerId),
    /// No live handle with this id
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
}

/// Result type for world operations.
pub type SimResult<T> = Result<T, SimError>;

/// Damage waiting for the damage phase.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DamageCommand {
    target: AgentId,
    source: Option<AgentId>,
    amount: f32,
}

#[derive(Debug)]
struct SpawnerSlot {
    spawner: PopulationSpawner,
    archetype: AgentConfig,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    /// Tick number (1-based)
    pub tick: u64,
    /// Simulation time after the tick
    pub now: f64,
    /// State transitions taken
    pub transitions: usize,
    /// Damage commands applied to a live target
    pub hits: usize,
    /// Enemies that died
    pub deaths: usize,
    /// Dead enemies released
    pub removed: usize,
    /// Enemies created by spawners
    pub spawned: usize,
}

/// Running totals over the world's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Ticks run
    pub ticks: u64,
    /// Enemies created (spawned or placed)
    pub spawned: u64,
    /// Enemy deaths
    pub deaths: u64,
    /// Enemies released after death
    pub removed: u64,
    /// Enemies destroyed by a spawner clear
    pub despawned: u64,
    /// Player deaths
    pub player_deaths: u64,
}

/// Owns every agent, the player, the spawners and the event bus.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    clock: SimClock,
    rng: fastrand::Rng,
    ids: AgentIdAllocator,
    agents: BTreeMap<AgentId, Agent>,
    player: Option<Player>,
    player_spawn: Vec2,
    spawners: BTreeMap<SpawnerId, SpawnerSlot>,
    next_spawner: u32,
    subscriptions: AHashMap<AgentId, SpawnerId>,
    /// Enemies touching the player as of the last tick
    contacts: AHashSet<AgentId>,
    queued_damage: Vec<DamageCommand>,
    events: Vec<SimEvent>,
    bus: EventBus,
    stats: WorldStats,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        info!(seed = config.seed, "world created");
        Self {
            rng: fastrand::Rng::with_seed(config.seed),
            bus: EventBus::new(config.event_capacity),
            config,
            clock: SimClock::new(),
            ids: AgentIdAllocator::new(),
            agents: BTreeMap::new(),
            player: None,
            player_spawn: Vec2::ZERO,
            spawners: BTreeMap::new(),
            next_spawner: 1,
            subscriptions: AHashMap::new(),
            contacts: AHashSet::new(),
            queued_damage: Vec::new(),
            events: Vec::new(),
            stats: WorldStats::default(),
        }
    }

    /// World configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.clock.tick()
    }

    /// Lifetime totals.
    #[must_use]
    pub const fn stats(&self) -> WorldStats {
        self.stats
    }

    // ----- player -----

    /// Places the player at `position`, which also becomes its respawn
    /// point. Replaces any previous player.
    pub fn place_player(&mut self, config: PlayerConfig, position: Vec2) -> AgentId {
        let id = self.ids.allocate();
        self.player = Some(Player::new(id, config, position));
        self.player_spawn = position;
        info!(player = %id, x = position.x, y = position.y, "player placed");
        id
    }

    /// The player, if placed.
    #[must_use]
    pub const fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// Mutable player access for input-driven movement.
    pub fn player_mut(&mut self) -> Option<&mut Player> {
        self.player.as_mut()
    }

    /// Position enemies should track: the living player, or `None`.
    #[must_use]
    pub fn current_target_position(&self) -> Option<Vec2> {
        self.player
            .as_ref()
            .filter(|p| p.is_alive())
            .map(Player::position)
    }

    /// Restores a dead player at its spawn point. Returns `false` if there
    /// is no player or it is alive.
    pub fn respawn_player(&mut self) -> bool {
        let position = self.player_spawn;
        let Some(player) = self.player.as_mut().filter(|p| !p.is_alive()) else {
            return false;
        };
        player.respawn(position);
        let id = player.id();
        info!(player = %id, "player respawned");
        self.events.push(SimEvent::PlayerRespawned {
            player: id,
            position,
        });
        push_full_vitals(&mut self.events, id, player.vitals());
        self.flush_events();
        true
    }

    // ----- agents -----

    /// Places an enemy directly, outside of any spawner.
    pub fn spawn_agent(&mut self, config: AgentConfig, position: Vec2) -> AgentId {
        let id = self.create_agent(config, position, None);
        self.flush_events();
        id
    }

    /// Agent by handle. Released handles no longer resolve.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Every agent in handle order, including dead ones awaiting removal.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values()
    }

    /// Presentation snapshot of every agent.
    #[must_use]
    pub fn views(&self) -> Vec<AgentView> {
        self.agents.values().map(Agent::view).collect()
    }

    /// Number of agents in the world, dead or alive.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of living agents.
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }

    /// Number of agents currently in `state`.
    #[must_use]
    pub fn count_in_state(&self, state: BehaviorState) -> usize {
        self.agents.values().filter(|a| a.state() == state).count()
    }

    /// Queues damage for the next damage phase.
    pub fn queue_damage(&mut self, target: AgentId, amount: f32, source: Option<AgentId>) {
        self.queued_damage.push(DamageCommand {
            target,
            source,
            amount,
        });
    }

    /// Heals an agent or the player.
    pub fn heal(&mut self, target: AgentId, amount: f32) -> SimResult<bool> {
        let vitals = self.vitals_mut(target)?;
        let changed = vitals.heal(amount);
        let (current, max) = (vitals.health().current(), vitals.health().max());
        if changed {
            self.events.push(SimEvent::HealthChanged {
                agent: target,
                current,
                max,
            });
            self.flush_events();
        }
        Ok(changed)
    }

    /// Overwrites health (and optionally max health).
    pub fn set_health(&mut self, target: AgentId, value: f32, max: Option<f32>) -> SimResult<bool> {
        let vitals = self.vitals_mut(target)?;
        let changed = vitals.set_health(value, max);
        let (current, max) = (vitals.health().current(), vitals.health().max());
        if changed {
            self.events.push(SimEvent::HealthChanged {
                agent: target,
                current,
                max,
            });
            self.flush_events();
        }
        Ok(changed)
    }

    /// Refills a shield instantly.
    pub fn recharge_shield_full(&mut self, target: AgentId) -> SimResult<bool> {
        let vitals = self.vitals_mut(target)?;
        let changed = vitals.recharge_shield_full();
        let shield = vitals.shield().map(|s| (s.current(), s.max()));
        if let (true, Some((current, max))) = (changed, shield) {
            self.events.push(SimEvent::ShieldChanged {
                agent: target,
                current,
                max,
            });
            self.flush_events();
        }
        Ok(changed)
    }

    /// Toggles automatic shield recharge. Returns whether a shield exists.
    pub fn set_shield_recharge_enabled(&mut self, target: AgentId, enabled: bool) -> SimResult<bool> {
        match self.vitals_mut(target)?.shield_mut() {
            Some(shield) => {
                shield.set_recharge_enabled(enabled);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    // ----- spawners -----

    /// Registers a stopped spawner producing `archetype`.
    ///
    /// An invalid spawner configuration is logged once and the spawner is
    /// kept, disabled, so the rest of the world runs normally.
    pub fn add_spawner(&mut self, archetype: AgentConfig, config: SpawnerConfig) -> SpawnerId {
        let id = SpawnerId::new(self.next_spawner);
        self.next_spawner += 1;
        let rng = fastrand::Rng::with_seed(self.rng.u64(..));
        let archetype = archetype.validated();
        let spawner = PopulationSpawner::new(id, archetype.name.clone(), config, rng);
        debug!(spawner = %id, archetype = spawner.archetype(), "spawner added");
        self.spawners.insert(id, SpawnerSlot { spawner, archetype });
        id
    }

    /// Spawner by handle.
    #[must_use]
    pub fn spawner(&self, id: SpawnerId) -> Option<&PopulationSpawner> {
        self.spawners.get(&id).map(|slot| &slot.spawner)
    }

    /// Every spawner in handle order.
    pub fn spawners(&self) -> impl Iterator<Item = &PopulationSpawner> + '_ {
        self.spawners.values().map(|slot| &slot.spawner)
    }

    /// Starts a spawner. Returns whether it changed state.
    pub fn start_spawner(&mut self, id: SpawnerId) -> SimResult<bool> {
        let slot = self.spawners.get_mut(&id).ok_or(SimError::UnknownSpawner(id))?;
        let started = slot.spawner.start();
        if started {
            self.events.push(SimEvent::SpawnerStarted { spawner: id });
            self.flush_events();
        }
        Ok(started)
    }

    /// Stops a spawner. Its roster is kept.
    pub fn stop_spawner(&mut self, id: SpawnerId) -> SimResult<bool> {
        let slot = self.spawners.get_mut(&id).ok_or(SimError::UnknownSpawner(id))?;
        let stopped = slot.spawner.stop();
        if stopped {
            self.events.push(SimEvent::SpawnerStopped { spawner: id });
            self.flush_events();
        }
        Ok(stopped)
    }

    /// Destroys every agent on a spawner's roster without death
    /// notifications. Returns how many were destroyed.
    pub fn clear_spawner(&mut self, id: SpawnerId) -> SimResult<usize> {
        let slot = self.spawners.get_mut(&id).ok_or(SimError::UnknownSpawner(id))?;
        let cleared = slot.spawner.clear();
        for agent in &cleared {
            self.subscriptions.remove(agent);
            if self.agents.remove(agent).is_some() {
                self.stats.despawned += 1;
                self.events.push(SimEvent::AgentDespawned {
                    agent: *agent,
                    spawner: id,
                });
            }
        }
        self.events.push(SimEvent::SpawnerCleared {
            spawner: id,
            count: cleared.len(),
        });
        self.flush_events();
        Ok(cleared.len())
    }

    /// Starts every spawner that is not disabled.
    pub fn start_all_spawners(&mut self) -> usize {
        let ids: Vec<SpawnerId> = self.spawners.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.start_spawner(*id).unwrap_or(false))
            .count()
    }

    /// Stops every spawner.
    pub fn stop_all_spawners(&mut self) -> usize {
        let ids: Vec<SpawnerId> = self.spawners.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.stop_spawner(*id).unwrap_or(false))
            .count()
    }

    /// Clears every spawner. Returns the total destroyed.
    pub fn clear_all_spawners(&mut self) -> usize {
        let ids: Vec<SpawnerId> = self.spawners.keys().copied().collect();
        ids.into_iter()
            .map(|id| self.clear_spawner(id).unwrap_or(0))
            .sum()
    }

    // ----- events -----

    /// Takes every published event. Each event is returned once.
    pub fn drain_events(&self) -> Vec<SimEvent> {
        self.bus.drain()
    }

    /// The event bus.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    // ----- tick -----

    /// Runs one simulation tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickSummary {
        self.tick_in_order(dt, false)
    }

    /// Tick body. `descending` reverses the decision order, which must not
    /// change the outcome.
    fn tick_in_order(&mut self, dt: f32, descending: bool) -> TickSummary {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let now = self.clock.advance(dt);
        let mut summary = TickSummary {
            tick: self.clock.tick(),
            now,
            ..TickSummary::default()
        };

        // Snapshot
        let target = self.player.as_ref().filter(|p| p.is_alive()).map(|p| TargetView {
            id: p.id(),
            position: p.position(),
        });
        let positions: AHashMap<AgentId, Vec2> = self
            .agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| (a.id(), a.position()))
            .collect();
        let grid = SpatialGrid::from_positions(
            self.config.spatial_cell_size,
            positions.iter().map(|(id, p)| (*id, *p)),
        );

        // Decide
        let mut commands = std::mem::take(&mut self.queued_damage);
        let mut transitions = Vec::new();
        for id in self.iteration_order(descending) {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            let Some(&position) = positions.get(&id) else {
                continue;
            };
            let separation = if agent.config().variant.separates() {
                let neighbors = grid
                    .resolve_nearby(position, agent.config().separation_radius)
                    .into_iter()
                    .filter(|other| *other != id)
                    .filter_map(|other| positions.get(&other).copied());
                steering::separation(
                    position,
                    neighbors,
                    agent.config().separation_strength,
                    agent.config().min_separation_distance,
                )
            } else {
                Vec2::ZERO
            };
            let perception = Perception {
                position,
                target,
                separation,
            };
            let plan = agent.plan(&perception, now);
            if let Some(transition) = plan.transition {
                transitions.push((id, transition));
            }
            if let Some(attack) = plan.attack {
                trace!(attacker = %id, target = %attack.target, "attack issued");
                commands.push(DamageCommand {
                    target: attack.target,
                    source: Some(id),
                    amount: attack.amount,
                });
            }
        }
        transitions.sort_by_key(|(id, _)| *id);
        summary.transitions = transitions.len();
        self.events
            .extend(transitions.into_iter().map(|(agent, t)| SimEvent::StateChanged {
                agent,
                from: t.from,
                to: t.to,
            }));

        // Player area attack
        if let Some(player) = self.player.as_mut() {
            if player.attack_ready(now) && player.config().attack_damage > 0.0 {
                player.record_attack(now);
                let config = player.config();
                let (source, damage) = (player.id(), config.attack_damage);
                for victim in grid.resolve_nearby(player.position(), config.attack_range) {
                    commands.push(DamageCommand {
                        target: victim,
                        source: Some(source),
                        amount: damage,
                    });
                }
            }
        }

        // Contact
        let touching: AHashSet<AgentId> = target
            .map(|t| grid.resolve_nearby(t.position, self.config.contact_radius))
            .unwrap_or_default()
            .into_iter()
            .collect();
        if let Some(target) = target {
            for &id in touching.difference(&self.contacts) {
                let damage = self.agents.get(&id).map_or(0.0, |a| a.config().contact_damage);
                if damage > 0.0 {
                    trace!(agent = %id, "contact with player");
                    commands.push(DamageCommand {
                        target: target.id,
                        source: Some(id),
                        amount: damage,
                    });
                }
            }
        }
        self.contacts = touching;

        // Move
        for agent in self.agents.values_mut().filter(|a| a.is_alive()) {
            agent.integrate(dt);
        }
        if let Some(player) = self.player.as_mut().filter(|p| p.is_alive()) {
            player.integrate(dt);
        }

        // Damage
        commands.sort_by_key(|c| (c.target, c.source));
        for command in commands {
            match self.apply_damage(command, now) {
                DamageResult::Missed => {},
                DamageResult::Hit => summary.hits += 1,
                DamageResult::Killed => {
                    summary.hits += 1;
                    summary.deaths += 1;
                    summary.transitions += 1;
                },
            }
        }

        // Recharge
        for agent in self.agents.values_mut().filter(|a| a.is_alive()) {
            let id = agent.id();
            if agent.vitals_mut().recharge_shield(now, dt) {
                push_shield(&mut self.events, id, agent.vitals());
            }
        }
        if let Some(player) = self.player.as_mut() {
            let id = player.id();
            if player.vitals_mut().recharge_shield(now, dt) {
                push_shield(&mut self.events, id, player.vitals());
            }
        }

        // Release
        let expired: Vec<AgentId> = self
            .agents
            .values()
            .filter(|a| a.ready_for_removal(now))
            .map(Agent::id)
            .collect();
        for id in expired {
            self.agents.remove(&id);
            self.subscriptions.remove(&id);
            self.stats.removed += 1;
            summary.removed += 1;
            debug!(agent = %id, "agent removed");
            self.events.push(SimEvent::AgentRemoved { agent: id });
        }

        // Spawn
        let target_position = self.current_target_position();
        let mut requests = Vec::new();
        for (id, slot) in &mut self.spawners {
            if let Some(request) = slot.spawner.tick(dt, target_position) {
                requests.push((*id, request.position));
            }
        }
        for (spawner_id, position) in requests {
            let Some(archetype) = self.spawners.get(&spawner_id).map(|s| s.archetype.clone()) else {
                continue;
            };
            let agent_id = self.create_agent(archetype, position, Some(spawner_id));
            let admitted = self
                .spawners
                .get_mut(&spawner_id)
                .is_some_and(|slot| slot.spawner.admit(agent_id));
            if admitted {
                self.subscriptions.insert(agent_id, spawner_id);
            }
            summary.spawned += 1;
        }

        self.stats.ticks += 1;
        self.flush_events();
        trace!(tick = summary.tick, living = self.living_count(), "tick complete");
        summary
    }

    fn apply_damage(&mut self, command: DamageCommand, now: f64) -> DamageResult {
        let DamageCommand {
            target,
            source,
            amount,
        } = command;

        if let Some(player) = self.player.as_mut().filter(|p| p.id() == target) {
            if !player.is_alive() {
                return DamageResult::Missed;
            }
            let outcome = player.vitals_mut().apply_damage(amount, now);
            self.events.push(SimEvent::AttackLanded {
                attacker: source,
                target,
                amount,
            });
            push_outcome(&mut self.events, target, player.vitals(), &outcome);
            if outcome.died {
                player.stop_movement();
                self.stats.player_deaths += 1;
                info!(player = %target, "player died");
                self.events.push(SimEvent::PlayerDied { player: target });
            }
            return DamageResult::Hit;
        }

        let Some(agent) = self.agents.get_mut(&target) else {
            return DamageResult::Missed;
        };
        if !agent.is_alive() {
            return DamageResult::Missed;
        }
        let outcome = agent.vitals_mut().apply_damage(amount, now);
        debug!(
            %target,
            amount,
            absorbed = outcome.absorbed,
            health = agent.vitals().health().current(),
            "damage applied"
        );
        self.events.push(SimEvent::AttackLanded {
            attacker: source,
            target,
            amount,
        });
        push_outcome(&mut self.events, target, agent.vitals(), &outcome);
        if !outcome.died {
            return DamageResult::Hit;
        }

        if let Some(transition) = agent.handle_death(now) {
            self.events.push(SimEvent::StateChanged {
                agent: target,
                from: transition.from,
                to: transition.to,
            });
        }
        self.stats.deaths += 1;
        debug!(agent = %target, killer = ?source, "agent died");
        self.events.push(SimEvent::AgentDied {
            agent: target,
            killer: source,
        });
        if let Some(spawner_id) = self.subscriptions.remove(&target) {
            if let Some(slot) = self.spawners.get_mut(&spawner_id) {
                slot.spawner.on_agent_died(target);
            }
        }
        DamageResult::Killed
    }

    fn create_agent(
        &mut self,
        config: AgentConfig,
        position: Vec2,
        spawner: Option<SpawnerId>,
    ) -> AgentId {
        let id = self.ids.allocate();
        let rng = fastrand::Rng::with_seed(self.rng.u64(..));
        let agent = Agent::spawn(id, config, position, rng, spawner);
        debug!(
            agent = %id,
            archetype = %agent.config().name,
            variant = agent.config().variant.display_name(),
            ?spawner,
            "agent spawned"
        );
        self.agents.insert(id, agent);
        self.stats.spawned += 1;
        self.events.push(SimEvent::AgentSpawned {
            agent: id,
            spawner,
            position,
        });
        id
    }

    fn vitals_mut(&mut self, target: AgentId) -> SimResult<&mut Vitals> {
        if let Some(player) = self.player.as_mut().filter(|p| p.id() == target) {
            return Ok(player.vitals_mut());
        }
        self.agents
            .get_mut(&target)
            .map(Agent::vitals_mut)
            .ok_or(SimError::UnknownAgent(target))
    }

    fn iteration_order(&self, descending: bool) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.keys().copied().collect();
        if descending {
            ids.reverse();
        }
        ids
    }

    fn flush_events(&mut self) {
        self.bus.publish_all(self.events.drain(..));
    }
}

enum DamageResult {
    Missed,
    Hit,
    Killed,
}

fn push_shield(events: &mut Vec<SimEvent>, agent: AgentId, vitals: &Vitals) {
    if let Some(shield) = vitals.shield() {
        events.push(SimEvent::ShieldChanged {
            agent,
            current: shield.current(),
            max: shield.max(),
        });
    }
}

fn push_health(events: &mut Vec<SimEvent>, agent: AgentId, vitals: &Vitals) {
    events.push(SimEvent::HealthChanged {
        agent,
        current: vitals.health().current(),
        max: vitals.health().max(),
    });
}

fn push_outcome(events: &mut Vec<SimEvent>, agent: AgentId, vitals: &Vitals, outcome: &DamageOutcome) {
    if outcome.shield_changed {
        push_shield(events, agent, vitals);
    }
    if outcome.health_changed {
        push_health(events, agent, vitals);
    }
}

fn push_full_vitals(events: &mut Vec<SimEvent>, agent: AgentId, vitals: &Vitals) {
    push_health(events, agent, vitals);
    push_shield(events, agent, vitals);
}
