//! Lifecycle mechanics: life states, world time and the commands a host
//! receives from the linking subsystem.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, SpawnId};

/// Lifecycle state of a creature instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LifeState {
    #[default]
    Alive,
    /// Dead, body still in the world.
    Corpse,
    /// Removed from the world, waiting for its respawn.
    Despawned,
}

/// World time in whole seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// The timestamp `secs` seconds later.
    pub fn after_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs as u64))
    }
}

/// Persistent "follow this leader" order for the motion system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowDirective {
    pub leader: EntityId,
    /// Gap to keep between the two bounding circles.
    pub distance: f32,
    /// Bearing relative to the leader's facing, in `[0, 2π)`.
    pub angle: f32,
}

/// A command issued to the host, as recorded by [`crate::WorldState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WorldCommand {
    /// Mutual threat between `who` and `hostile`; both are put in combat with each other.
    AddThreat { who: EntityId, hostile: EntityId },
    /// Arm `hostile`'s engagement timer against `who`.
    TriggerCombatTimer { hostile: EntityId, who: EntityId },
    AttackStart { who: EntityId, hostile: EntityId },
    EnterEvadeMode { who: EntityId },
    Kill { who: EntityId },
    ForceDespawn { who: EntityId },
    Respawn { who: EntityId },
    /// Ask the spawn system to (re)create a spawn table row.
    RespawnSpawn { spawn: SpawnId },
    MoveFollow { who: EntityId, directive: FollowDirective },
}

impl WorldCommand {
    /// The creature the command acts on, if it targets a live instance.
    pub fn subject(&self) -> Option<EntityId> {
        match self {
            WorldCommand::AddThreat { who, .. }
            | WorldCommand::TriggerCombatTimer { who, .. }
            | WorldCommand::AttackStart { who, .. }
            | WorldCommand::EnterEvadeMode { who }
            | WorldCommand::Kill { who }
            | WorldCommand::ForceDespawn { who }
            | WorldCommand::Respawn { who }
            | WorldCommand::MoveFollow { who, .. } => Some(*who),
            WorldCommand::RespawnSpawn { .. } => None,
        }
    }

    /// Whether the command makes its subject take part in a fight.
    pub fn is_combat_entry(&self) -> bool {
        matches!(
            self,
            WorldCommand::AddThreat { .. } | WorldCommand::AttackStart { .. }
        )
    }
}

/// Lifecycle transitions produced when queued commands are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldTransition {
    /// A new instance entered the world.
    Spawned(EntityId),
    /// An existing instance came back to life.
    Respawned(EntityId),
    Despawned(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let t = Timestamp::from_secs(10);
        assert!(t.after_secs(5) > t);
        assert_eq!(t.after_secs(5).as_secs(), 15);
        assert_eq!(Timestamp(u64::MAX).after_secs(1), Timestamp(u64::MAX));
    }

    #[test]
    fn test_command_subject() {
        let who = EntityId::new();
        let hostile = EntityId::new();

        assert_eq!(WorldCommand::AddThreat { who, hostile }.subject(), Some(who));
        assert_eq!(
            WorldCommand::RespawnSpawn { spawn: SpawnId(3) }.subject(),
            None
        );
        assert!(WorldCommand::AttackStart { who, hostile }.is_combat_entry());
        assert!(!WorldCommand::Kill { who }.is_combat_entry());
    }
}
