//! Headless run loop.
//!
//! Builds a [`World`] from the engine configuration, walks the player along a
//! scripted orbit in place of input, and steps the world at a fixed rate.
//! Drained events go to the [`GameSession`] and, optionally, to a JSON-lines
//! log. Session commands are carried out between ticks.

use std::io::Write;

use anyhow::{Context, Result};
use horde_common::Vec2;
use horde_sim::{GameSession, SessionCommand, SimEvent, World, WorldStats};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::timing::{FixedTimestep, FramePacer};

/// Distance at which the scripted player counts as on its orbit point.
const ORBIT_ARRIVE_DISTANCE: f32 = 0.05;

#[derive(Serialize)]
struct LogLine<'a> {
    tick: u64,
    time: f64,
    #[serde(flatten)]
    event: &'a SimEvent,
}

/// Writes events as JSON lines, one object per event, tagged with the tick
/// they were published on.
pub struct EventLog<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> EventLog<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Appends a batch of events.
    pub fn record(&mut self, tick: u64, time: f64, events: &[SimEvent]) -> Result<()> {
        for event in events {
            serde_json::to_writer(&mut self.writer, &LogLine { tick, time, event })
                .context("failed to encode event")?;
            self.writer
                .write_all(b"\n")
                .context("failed to write event log")?;
            self.written += 1;
        }
        Ok(())
    }

    /// Events written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("failed to flush event log")?;
        Ok(self.writer)
    }
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    /// Fixed ticks run
    pub ticks: u64,
    /// Simulated seconds
    pub sim_seconds: f64,
    /// Enemies created
    pub spawned: u64,
    /// Enemy deaths
    pub deaths: u64,
    /// Enemies destroyed by spawner clears
    pub despawned: u64,
    /// Player deaths
    pub player_deaths: u64,
    /// Kills credited by the session
    pub kills: u64,
    /// Final score
    pub score: u64,
    /// Lives left
    pub lives: u32,
    /// Agents still in the world
    pub population: usize,
    /// Whether the session ended in game over
    pub game_over: bool,
}

impl RunSummary {
    fn log(&self) {
        info!(
            ticks = self.ticks,
            seconds = self.sim_seconds,
            spawned = self.spawned,
            deaths = self.deaths,
            despawned = self.despawned,
            player_deaths = self.player_deaths,
            kills = self.kills,
            score = self.score,
            lives = self.lives,
            population = self.population,
            game_over = self.game_over,
            "run complete"
        );
    }
}

/// Drives one configured run.
pub struct Runner {
    config: EngineConfig,
    world: World,
    session: GameSession,
    timestep: FixedTimestep,
    orbit_angle: f32,
    event_log: Option<EventLog<Box<dyn Write>>>,
}

impl Runner {
    /// Builds the world: player, archetypes and stopped spawners.
    pub fn new(mut config: EngineConfig) -> Result<Self> {
        config.validate();
        let table = config
            .archetype_table()
            .context("failed to build archetype table")?;

        let mut world = World::new(config.world.clone());
        let player = world.place_player(config.player.clone().validated(), config.player_start);
        for entry in &config.spawners {
            let archetype = table
                .get(&entry.archetype)
                .with_context(|| format!("spawner for '{}' cannot be built", entry.archetype))?;
            let id = world.add_spawner(archetype.clone(), entry.spawner_config());
            debug!(spawner = %id, archetype = %entry.archetype, "spawner registered");
        }

        Ok(Self {
            session: GameSession::new(config.session.clone(), player),
            timestep: FixedTimestep::new(config.tick_rate),
            config,
            world,
            orbit_angle: 0.0,
            event_log: None,
        })
    }

    /// Sends every drained event to `writer` as JSON lines.
    #[must_use]
    pub fn with_event_log(mut self, writer: Box<dyn Write>) -> Self {
        self.event_log = Some(EventLog::new(writer));
        self
    }

    /// The simulated world.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The score and lives tracker.
    pub const fn session(&self) -> &GameSession {
        &self.session
    }

    /// Runs until the configured duration elapses, or until game over when
    /// `stop_on_game_over` is set. With `realtime`, frames are paced to the
    /// wall clock; otherwise each frame feeds `frame_time` seconds.
    pub fn run(mut self, realtime: bool) -> Result<RunSummary> {
        let started = self.world.start_all_spawners();
        info!(
            spawners = started,
            duration = self.config.duration,
            tick_rate = self.config.tick_rate,
            seed = self.config.world.seed,
            "run started"
        );

        let mut pacer = realtime.then(|| FramePacer::new(self.config.tick_rate));
        while self.world.now() < f64::from(self.config.duration) && !self.finished() {
            let frame_dt = match pacer.as_mut() {
                Some(pacer) => pacer.delta_time(),
                None => self.config.frame_time,
            };
            for _ in 0..self.timestep.accumulate(frame_dt) {
                if self.finished() {
                    break;
                }
                self.step()?;
            }
            if let Some(pacer) = &pacer {
                pacer.sleep_remainder();
            }
        }

        // Events raised by commands applied after the last tick
        let trailing = self.world.drain_events();
        if let Some(mut log) = self.event_log.take() {
            log.record(self.world.tick_count(), self.world.now(), &trailing)?;
            let written = log.written();
            log.finish()?;
            info!(written, "event log closed");
        }

        let summary = self.summary();
        summary.log();
        Ok(summary)
    }

    /// Runs one fixed tick and everything hanging off it.
    pub fn step(&mut self) -> Result<()> {
        let dt = self.timestep.fixed_dt();
        self.drive_player(dt);
        let tick = self.world.tick(dt);

        let events = self.world.drain_events();
        if let Some(log) = self.event_log.as_mut() {
            log.record(tick.tick, tick.now, &events)?;
        }
        let mut commands = self.session.observe_all(&events);
        commands.extend(self.session.tick(dt));
        for command in commands {
            self.apply(command);
        }
        Ok(())
    }

    /// Current totals.
    pub fn summary(&self) -> RunSummary {
        let WorldStats {
            ticks,
            spawned,
            deaths,
            despawned,
            player_deaths,
            ..
        } = self.world.stats();
        RunSummary {
            ticks,
            sim_seconds: self.world.now(),
            spawned,
            deaths,
            despawned,
            player_deaths,
            kills: self.session.kills(),
            score: self.session.score(),
            lives: self.session.lives(),
            population: self.world.agent_count(),
            game_over: self.session.is_game_over(),
        }
    }

    fn finished(&self) -> bool {
        self.config.stop_on_game_over && self.session.is_game_over()
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::RespawnPlayer => {
                self.world.respawn_player();
            },
            SessionCommand::EndGame => {
                let stopped = self.world.stop_all_spawners();
                let cleared = self.world.clear_all_spawners();
                info!(stopped, cleared, "spawners shut down");
            },
        }
    }

    fn drive_player(&mut self, dt: f32) {
        self.orbit_angle += self.config.player_orbit_speed * dt;
        let goal = self.config.player_start
            + Vec2::from_angle(self.orbit_angle) * self.config.player_orbit_radius;
        if let Some(player) = self.world.player_mut().filter(|p| p.is_alive()) {
            let offset = goal - player.position();
            if offset.length() > ORBIT_ARRIVE_DISTANCE {
                player.move_in_direction(offset);
            } else {
                player.stop_movement();
            }
        }
    }
}
