//! Score, lives and respawn bookkeeping.
//!
//! The session is a pure consumer of drained [`SimEvent`]s. It never reaches
//! into the world; instead it hands back [`SessionCommand`]s for the owner
//! of the world to carry out.

use horde_common::AgentId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::SimEvent;

/// Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lives at the start of a game
    pub lives: u32,
    /// Score awarded per enemy the player kills
    pub points_per_kill: u64,
    /// Seconds between player death and respawn
    pub respawn_delay: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lives: 3,
            points_per_kill: 10,
            respawn_delay: 3.0,
        }
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Player alive, game in progress
    Running,
    /// Player dead, respawn pending
    AwaitingRespawn,
    /// Out of lives
    GameOver,
}

/// Action the session asks its owner to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Restore the player at its spawn point
    RespawnPlayer,
    /// Stop and clear every spawner
    EndGame,
}

/// Game session state.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: SessionConfig,
    player: AgentId,
    lives: u32,
    score: u64,
    kills: u64,
    phase: SessionPhase,
    respawn_timer: f32,
}

impl GameSession {
    /// Starts a session tracking `player`.
    #[must_use]
    pub fn new(config: SessionConfig, player: AgentId) -> Self {
        let lives = config.lives.max(1);
        Self {
            config,
            player,
            lives,
            score: 0,
            kills: 0,
            phase: SessionPhase::Running,
            respawn_timer: 0.0,
        }
    }

    /// Remaining lives.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Enemy deaths observed.
    #[must_use]
    pub const fn kills(&self) -> u64 {
        self.kills
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the game has ended.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.phase == SessionPhase::GameOver
    }

    /// Adds points directly.
    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Consumes one event.
    pub fn observe(&mut self, event: &SimEvent) -> Option<SessionCommand> {
        match event {
            SimEvent::AgentDied { killer, .. } => {
                self.kills += 1;
                if *killer == Some(self.player) {
                    self.add_score(self.config.points_per_kill);
                }
                None
            },
            SimEvent::PlayerDied { player } if *player == self.player => self.on_player_died(),
            _ => None,
        }
    }

    /// Consumes a batch, returning every command raised.
    pub fn observe_all<'a, I>(&mut self, events: I) -> Vec<SessionCommand>
    where
        I: IntoIterator<Item = &'a SimEvent>,
    {
        events.into_iter().filter_map(|e| self.observe(e)).collect()
    }

    /// Advances the respawn timer.
    pub fn tick(&mut self, dt: f32) -> Option<SessionCommand> {
        if self.phase != SessionPhase::AwaitingRespawn {
            return None;
        }
        self.respawn_timer -= dt.max(0.0);
        if self.respawn_timer > 0.0 {
            return None;
        }
        self.phase = SessionPhase::Running;
        Some(SessionCommand::RespawnPlayer)
    }

    /// Starts a fresh game after game over. Returns `false` otherwise.
    pub fn restart(&mut self) -> bool {
        if !self.is_game_over() {
            return false;
        }
        self.lives = self.config.lives.max(1);
        self.score = 0;
        self.kills = 0;
        self.phase = SessionPhase::Running;
        info!(lives = self.lives, "game restarted");
        true
    }

    fn on_player_died(&mut self) -> Option<SessionCommand> {
        if self.phase != SessionPhase::Running {
            return None;
        }
        self.lives = self.lives.saturating_sub(1);
        if self.lives > 0 {
            self.phase = SessionPhase::AwaitingRespawn;
            self.respawn_timer = self.config.respawn_delay;
            info!(lives = self.lives, "player died, respawn pending");
            None
        } else {
            self.phase = SessionPhase::GameOver;
            info!(score = self.score, kills = self.kills, "game over");
            Some(SessionCommand::EndGame)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: AgentId = AgentId::from_raw(1);

    fn kill(raw: u64, killer: Option<AgentId>) -> SimEvent {
        SimEvent::AgentDied {
            agent: AgentId::from_raw(raw),
            killer,
        }
    }

    #[test]
    fn test_player_kills_score() {
        let mut session = GameSession::new(SessionConfig::default(), PLAYER);
        session.observe(&kill(5, Some(PLAYER)));
        session.observe(&kill(6, None));
        assert_eq!(session.kills(), 2);
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn test_despawn_is_not_a_kill() {
        let mut session = GameSession::new(SessionConfig::default(), PLAYER);
        let event = SimEvent::AgentDespawned {
            agent: AgentId::from_raw(4),
            spawner: horde_common::SpawnerId::new(1),
        };
        assert!(session.observe(&event).is_none());
        assert_eq!(session.kills(), 0);
    }

    #[test]
    fn test_respawn_after_delay() {
        let mut session = GameSession::new(SessionConfig::default(), PLAYER);
        assert!(session.observe(&SimEvent::PlayerDied { player: PLAYER }).is_none());
        assert_eq!(session.lives(), 2);
        assert_eq!(session.phase(), SessionPhase::AwaitingRespawn);

        assert!(session.tick(2.0).is_none());
        assert_eq!(session.tick(1.0), Some(SessionCommand::RespawnPlayer));
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.tick(10.0).is_none());
    }

    #[test]
    fn test_last_life_ends_game() {
        let config = SessionConfig {
            lives: 1,
            ..SessionConfig::default()
        };
        let mut session = GameSession::new(config, PLAYER);
        let commands = session.observe_all(&[
            SimEvent::PlayerDied { player: PLAYER },
            SimEvent::PlayerDied { player: PLAYER },
        ]);
        assert_eq!(commands, vec![SessionCommand::EndGame]);
        assert!(session.is_game_over());
        assert_eq!(session.lives(), 0);
    }

    #[test]
    fn test_death_while_awaiting_respawn_ignored() {
        let mut session = GameSession::new(SessionConfig::default(), PLAYER);
        session.observe(&SimEvent::PlayerDied { player: PLAYER });
        session.observe(&SimEvent::PlayerDied { player: PLAYER });
        assert_eq!(session.lives(), 2);
    }

    #[test]
    fn test_restart_only_after_game_over() {
        let config = SessionConfig {
            lives: 1,
            ..SessionConfig::default()
        };
        let mut session = GameSession::new(config, PLAYER);
        session.add_score(40);
        assert!(!session.restart());
        session.observe(&SimEvent::PlayerDied { player: PLAYER });
        assert!(session.restart());
        assert_eq!(session.lives(), 1);
        assert_eq!(session.score(), 0);
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_other_player_ignored() {
        let mut session = GameSession::new(SessionConfig::default(), PLAYER);
        let other = SimEvent::PlayerDied {
            player: AgentId::from_raw(99),
        };
        assert!(session.observe(&other).is_none());
        assert_eq!(session.lives(), 3);
    }
}
