//! Event bus for simulation notifications.
//!
//! The world buffers events while a tick runs and publishes them all at the
//! tick boundary, so consumers never observe a half-applied tick. Each event
//! instance is delivered at most once: `drain` removes what it returns.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use horde_common::{AgentId, SpawnerId, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::behavior::BehaviorState;

/// Notifications raised by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SimEvent {
    /// An enemy entered the world
    AgentSpawned {
        /// New agent
        agent: AgentId,
        /// Spawner that created it, if any
        spawner: Option<SpawnerId>,
        /// Spawn position
        position: Vec2,
    },
    /// An agent changed behavior state
    StateChanged {
        /// Agent
        agent: AgentId,
        /// Previous state
        from: BehaviorState,
        /// New state
        to: BehaviorState,
    },
    /// Health value changed
    HealthChanged {
        /// Agent (enemy or player)
        agent: AgentId,
        /// New current value
        current: f32,
        /// Max value
        max: f32,
    },
    /// Shield value changed
    ShieldChanged {
        /// Agent (enemy or player)
        agent: AgentId,
        /// New current value
        current: f32,
        /// Max value
        max: f32,
    },
    /// An attack went through the damage pipeline
    AttackLanded {
        /// Attacker, if the damage came from an agent
        attacker: Option<AgentId>,
        /// Victim
        target: AgentId,
        /// Damage before mitigation
        amount: f32,
    },
    /// An enemy died. Raised exactly once per agent.
    AgentDied {
        /// Dead agent
        agent: AgentId,
        /// Who dealt the killing blow, if known
        killer: Option<AgentId>,
    },
    /// A dead enemy's removal delay elapsed and its handle was released
    AgentRemoved {
        /// Released agent
        agent: AgentId,
    },
    /// An enemy was destroyed by a spawner clear, bypassing death
    AgentDespawned {
        /// Destroyed agent
        agent: AgentId,
        /// Spawner that cleared it
        spawner: SpawnerId,
    },
    /// The player died
    PlayerDied {
        /// Player handle
        player: AgentId,
    },
    /// The player was restored after dying
    PlayerRespawned {
        /// Player handle
        player: AgentId,
        /// Respawn position
        position: Vec2,
    },
    /// A spawner started ticking
    SpawnerStarted {
        /// Spawner
        spawner: SpawnerId,
    },
    /// A spawner stopped ticking
    SpawnerStopped {
        /// Spawner
        spawner: SpawnerId,
    },
    /// A spawner destroyed its roster
    SpawnerCleared {
        /// Spawner
        spawner: SpawnerId,
        /// Number of agents destroyed
        count: usize,
    },
}

impl SimEvent {
    /// The agent this event is primarily about, if any.
    #[must_use]
    pub const fn agent(&self) -> Option<AgentId> {
        match self {
            Self::AgentSpawned { agent, .. }
            | Self::StateChanged { agent, .. }
            | Self::HealthChanged { agent, .. }
            | Self::ShieldChanged { agent, .. }
            | Self::AgentDied { agent, .. }
            | Self::AgentRemoved { agent }
            | Self::AgentDespawned { agent, .. } => Some(*agent),
            Self::AttackLanded { target, .. } => Some(*target),
            Self::PlayerDied { player } | Self::PlayerRespawned { player, .. } => Some(*player),
            Self::SpawnerStarted { .. }
            | Self::SpawnerStopped { .. }
            | Self::SpawnerCleared { .. } => None,
        }
    }
}

/// Bounded channel carrying [`SimEvent`]s to consumers.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<SimEvent>,
    receiver: Receiver<SimEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns `false` if the bus was full and the
    /// event was dropped.
    pub fn publish(&self, event: SimEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(?event, capacity = self.capacity, "event bus full, dropping event");
                false
            },
            // The bus owns its own receiver, so this cannot happen
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Publishes a batch in order. Returns how many were accepted.
    pub fn publish_all<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = SimEvent>,
    {
        events
            .into_iter()
            .map(|event| self.publish(event))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<SimEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a receiver handle for consumers on another thread.
    #[must_use]
    pub fn subscriber(&self) -> Receiver<SimEvent> {
        self.receiver.clone()
    }
}
