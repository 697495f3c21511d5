//! Creature records.

use serde::{Deserialize, Serialize};

use super::{EntityId, MapId, Position, SpawnId, TemplateId};
use crate::catalog::{CreatureTemplate, SpawnData};
use crate::mechanics::{LifeState, Timestamp};

/// A snapshot of one creature instance as the simulation sees it.
///
/// Snapshots are plain values: hosts hand out copies, so holding one never
/// keeps the underlying creature alive or borrowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub id: EntityId,
    pub template: TemplateId,
    /// `None` for creatures that do not come from the spawn table (summons).
    pub spawn_id: Option<SpawnId>,
    pub map: MapId,

    /// Canonical (respawn) position. Link ranges and follow geometry use this,
    /// never the current position.
    pub home: Position,
    pub bounding_radius: f32,

    pub life: LifeState,
    pub in_combat: bool,
    pub player_controlled: bool,
    /// Player-owned companions take no part in linking.
    pub companion: bool,

    /// Respawn delay in seconds.
    pub respawn_delay: u32,
    pub died_at: Option<Timestamp>,
}

impl Creature {
    /// Create a new alive creature of the given template.
    pub fn new(template: TemplateId, map: MapId, home: Position) -> Self {
        Self {
            id: EntityId::new(),
            template,
            spawn_id: None,
            map,
            home,
            bounding_radius: 0.0,
            life: LifeState::Alive,
            in_combat: false,
            player_controlled: false,
            companion: false,
            respawn_delay: 0,
            died_at: None,
        }
    }

    /// Instantiate a spawn table row.
    pub fn from_spawn(data: &SpawnData, template: &CreatureTemplate) -> Self {
        Self::new(data.template, data.map, data.position)
            .with_spawn_id(data.id)
            .with_bounding_radius(template.bounding_radius)
            .with_respawn_delay(data.respawn_delay.unwrap_or(template.respawn_delay))
    }

    pub fn with_spawn_id(mut self, spawn_id: SpawnId) -> Self {
        self.spawn_id = Some(spawn_id);
        self
    }

    pub fn with_bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_radius = radius.max(0.0);
        self
    }

    pub fn with_respawn_delay(mut self, seconds: u32) -> Self {
        self.respawn_delay = seconds;
        self
    }

    pub fn with_life(mut self, life: LifeState) -> Self {
        self.life = life;
        self
    }

    pub fn player_controlled(mut self) -> Self {
        self.player_controlled = true;
        self
    }

    pub fn companion(mut self) -> Self {
        self.companion = true;
        self
    }

    /// Check if the creature is alive.
    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_corpse(&self) -> bool {
        self.life == LifeState::Corpse
    }

    pub fn is_despawned(&self) -> bool {
        self.life == LifeState::Despawned
    }

    /// Whether the creature's own respawn delay has run out since it last died.
    ///
    /// A creature without a delay, or one that never died, is always ready.
    pub fn respawn_delay_elapsed(&self, now: Timestamp) -> bool {
        if self.respawn_delay == 0 {
            return true;
        }
        match self.died_at {
            Some(died_at) => now >= died_at.after_secs(self.respawn_delay),
            None => true,
        }
    }
}
