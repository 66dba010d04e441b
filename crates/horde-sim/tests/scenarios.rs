//! End-to-end scenarios driven through `World`.
//!
//! Each test builds a small world, ticks it at a fixed step and checks the
//! observable results: agent state, vitals and the drained event stream.

use horde_common::{AgentId, Vec2};
use horde_sim::{
    AgentConfig, BehaviorState, GameSession, InitialBehavior, PlayerConfig, SessionCommand,
    SessionConfig, ShieldConfig, SimEvent, SpawnPlacement, SpawnerConfig, World, WorldConfig,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn world() -> World {
    World::new(WorldConfig::with_seed(42))
}

/// A player that never attacks and has no shield.
fn target_dummy() -> PlayerConfig {
    PlayerConfig {
        attack_damage: 0.0,
        shield: None,
        max_health: 1000.0,
        ..PlayerConfig::default()
    }
}

fn far_away_spawner(interval: f32, capacity: u32) -> SpawnerConfig {
    SpawnerConfig::new(interval, capacity)
        .with_placement(SpawnPlacement::FixedPoints(vec![Vec2::new(100.0, 100.0)]))
}

fn shield_values(events: &[SimEvent], agent: AgentId) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e {
            SimEvent::ShieldChanged { agent: a, current, .. } if *a == agent => Some(*current),
            _ => None,
        })
        .collect()
}

fn attacks_by(events: &[SimEvent], attacker: AgentId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SimEvent::AttackLanded { attacker: Some(a), .. } if *a == attacker))
        .count()
}

// ── Damage pipeline ────────────────────────────────────────────────────

#[test]
fn test_shield_absorbs_then_recharges() {
    let mut world = world();
    let config = AgentConfig::named("shielded")
        .with_shield(ShieldConfig::default())
        .with_initial_behavior(InitialBehavior::Idle);
    let id = world.spawn_agent(config, Vec2::ZERO);
    world.drain_events();

    world.queue_damage(id, 60.0, None);
    world.tick(1.0);
    let vitals = world.agent(id).map(|a| a.vitals().clone()).expect("agent exists");
    assert_eq!(vitals.shield().map(|s| s.current()), Some(0.0));
    assert_eq!(vitals.health().current(), 90.0);

    for _ in 0..10 {
        world.tick(1.0);
    }
    let events = world.drain_events();
    assert_eq!(
        shield_values(&events, id),
        vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]
    );
    let agent = world.agent(id).expect("agent exists");
    assert_eq!(agent.vitals().health().current(), 90.0);
    assert_eq!(agent.vitals().shield().map(|s| s.current()), Some(50.0));
}

#[test]
fn test_overkill_fires_one_death() {
    let mut world = world();
    let id = world.spawn_agent(AgentConfig::default().with_max_health(30.0), Vec2::ZERO);
    for _ in 0..3 {
        world.queue_damage(id, 50.0, None);
        world.tick(0.1);
    }
    world.queue_damage(id, 0.0, None);
    world.tick(0.1);

    let events = world.drain_events();
    let deaths = events
        .iter()
        .filter(|e| matches!(e, SimEvent::AgentDied { agent, .. } if *agent == id))
        .count();
    assert_eq!(deaths, 1);
    assert_eq!(world.agent(id).map(|a| a.state()), Some(BehaviorState::Dead));
}

// ── Behavior ───────────────────────────────────────────────────────────

#[test]
fn test_patrol_chase_attack_by_distance() {
    let mut world = world();
    let player = world.place_player(target_dummy(), Vec2::ZERO);
    let stationary = AgentConfig {
        patrol_range: 0.0,
        move_speed: 0.0,
        ..AgentConfig::default()
    };
    let enemy = world.spawn_agent(stationary, Vec2::new(12.0, 0.0));
    let state = |w: &World| w.agent(enemy).map(|a| a.state());

    world.tick(0.5);
    assert_eq!(state(&world), Some(BehaviorState::Patrol));

    // Distance 8: inside detection range
    world.player_mut().expect("player").set_position(Vec2::new(4.0, 0.0));
    world.tick(0.5);
    assert_eq!(state(&world), Some(BehaviorState::Chase));

    // Distance 1.5: inside attack range
    world.player_mut().expect("player").set_position(Vec2::new(10.5, 0.0));
    world.tick(0.5);
    assert_eq!(state(&world), Some(BehaviorState::Attack));
    world.drain_events();

    world.tick(0.5);
    world.tick(0.5);
    let events = world.drain_events();
    assert_eq!(attacks_by(&events, enemy), 1);
    assert!(events.contains(&SimEvent::AttackLanded {
        attacker: Some(enemy),
        target: player,
        amount: 10.0,
    }));
    let health = world.player().map(|p| p.vitals().health().current());
    assert_eq!(health, Some(990.0));
}

#[test]
fn test_transitions_are_observable() {
    let mut world = world();
    world.place_player(target_dummy(), Vec2::ZERO);
    let enemy = world.spawn_agent(AgentConfig::default(), Vec2::new(3.0, 0.0));
    for _ in 0..4 {
        world.tick(0.25);
    }
    let transitions: Vec<(BehaviorState, BehaviorState)> = world
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            SimEvent::StateChanged { agent, from, to } if agent == enemy => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (BehaviorState::Patrol, BehaviorState::Chase),
            (BehaviorState::Chase, BehaviorState::Attack),
        ]
    );
}

#[test]
fn test_lost_target_returns_to_patrol() {
    let mut world = world();
    let player = world.place_player(target_dummy(), Vec2::ZERO);
    let enemy = world.spawn_agent(AgentConfig::default(), Vec2::new(5.0, 0.0));
    world.tick(0.1);
    assert_eq!(world.agent(enemy).map(|a| a.state()), Some(BehaviorState::Chase));

    world.queue_damage(player, 10_000.0, None);
    world.tick(0.1);
    assert!(world.current_target_position().is_none());
    world.tick(0.1);
    let state = world.agent(enemy).map(|a| a.state());
    assert_eq!(state, Some(BehaviorState::Patrol));
}

#[test]
fn test_killed_enemy_stops_and_is_released() {
    let mut world = world();
    world.place_player(target_dummy(), Vec2::ZERO);
    let enemy = world.spawn_agent(AgentConfig::default(), Vec2::new(5.0, 0.0));
    world.tick(0.1);
    world.queue_damage(enemy, 500.0, None);
    world.tick(0.1);

    let agent = world.agent(enemy).expect("still awaiting removal");
    assert_eq!(agent.state(), BehaviorState::Dead);
    assert_eq!(agent.velocity(), Vec2::ZERO);
    let position = agent.position();

    for _ in 0..19 {
        world.tick(0.1);
    }
    assert_eq!(world.agent(enemy).map(|a| a.position()), Some(position));
    for _ in 0..2 {
        world.tick(0.1);
    }
    assert!(world.agent(enemy).is_none());
}

// ── Spawner ────────────────────────────────────────────────────────────

#[test]
fn test_spawner_capacity_over_ten_seconds() {
    let mut world = world();
    let spawner = world.add_spawner(AgentConfig::default(), far_away_spawner(2.0, 3));
    world.start_spawner(spawner).expect("spawner exists");

    for _ in 0..100 {
        world.tick(0.1);
        assert!(world.living_count() <= 3);
    }
    assert_eq!(world.living_count(), 3);
    assert_eq!(world.spawner(spawner).map(|s| s.active_count()), Some(3));
}

#[test]
fn test_death_permits_next_spawn() {
    let mut world = world();
    let spawner = world.add_spawner(AgentConfig::default(), far_away_spawner(1.0, 1));
    world.start_spawner(spawner).expect("spawner exists");
    world.tick(0.5);
    let first: Vec<AgentId> = world.spawner(spawner).map(|s| s.roster().collect()).unwrap_or_default();
    assert_eq!(first.len(), 1);

    world.queue_damage(first[0], 1000.0, None);
    world.tick(0.5);
    assert_eq!(world.spawner(spawner).map(|s| s.active_count()), Some(0));
    world.tick(0.5);
    assert_eq!(world.spawner(spawner).map(|s| s.active_count()), Some(1));
    assert_eq!(world.stats().spawned, 2);
}

#[test]
fn test_clear_is_not_double_counted() {
    let mut world = world();
    world.place_player(target_dummy(), Vec2::ZERO);
    let spawner = world.add_spawner(AgentConfig::default(), far_away_spawner(0.5, 4));
    world.start_spawner(spawner).expect("spawner exists");
    for _ in 0..8 {
        world.tick(0.5);
    }
    let roster: Vec<AgentId> = world.spawner(spawner).map(|s| s.roster().collect()).unwrap_or_default();
    assert_eq!(roster.len(), 4);

    world.stop_spawner(spawner).expect("spawner exists");
    assert_eq!(world.clear_spawner(spawner), Ok(4));
    for id in &roster {
        world.queue_damage(*id, 1000.0, None);
    }
    world.tick(0.5);

    let events = world.drain_events();
    assert!(!events.iter().any(|e| matches!(e, SimEvent::AgentDied { .. })));
    assert_eq!(world.stats().deaths, 0);
    assert_eq!(world.agent_count(), 0);

    let mut session = GameSession::new(SessionConfig::default(), AgentId::from_raw(1));
    session.observe_all(&events);
    assert_eq!(session.kills(), 0);
}

// ── Session ────────────────────────────────────────────────────────────

#[test]
fn test_session_respawns_then_ends_game() {
    let mut world = world();
    let player = world.place_player(target_dummy(), Vec2::new(1.0, 1.0));
    let config = SessionConfig {
        lives: 2,
        respawn_delay: 1.0,
        ..SessionConfig::default()
    };
    let mut session = GameSession::new(config, player);
    let spawner = world.add_spawner(AgentConfig::default(), far_away_spawner(1.0, 2));
    assert_eq!(world.start_all_spawners(), 1);

    world.queue_damage(player, 5000.0, None);
    world.tick(0.5);
    assert!(session.observe_all(&world.drain_events()).is_empty());
    assert_eq!(session.lives(), 1);
    assert!(world.current_target_position().is_none());

    assert_eq!(session.tick(0.5), None);
    assert_eq!(session.tick(0.5), Some(SessionCommand::RespawnPlayer));
    assert!(world.respawn_player());
    assert_eq!(world.current_target_position(), Some(Vec2::new(1.0, 1.0)));

    world.queue_damage(player, 5000.0, None);
    world.tick(0.5);
    let commands = session.observe_all(&world.drain_events());
    assert_eq!(commands, vec![SessionCommand::EndGame]);
    assert!(session.is_game_over());

    world.stop_all_spawners();
    world.clear_all_spawners();
    assert_eq!(world.spawner(spawner).map(|s| s.active_count()), Some(0));
    assert!(world.spawner(spawner).is_some_and(|s| !s.is_running()));
    assert_eq!(world.agent_count(), 0);
}
