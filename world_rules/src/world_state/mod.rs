//! World state management - an in-memory, single-map simulation context.
//!
//! [`WorldState`] implements [`LinkHost`] without simulating anything: every
//! primitive is recorded in a journal, synchronous primitives flip the
//! creature's state immediately, and respawn/despawn requests are queued until
//! [`WorldState::apply_pending`] runs them and reports the resulting
//! transitions.
//!
//! With dynamic spawning, a despawned creature is detached from its spawn row
//! at once, so the spawn system can recreate the row, but stays resolvable by
//! id until the next [`WorldState::apply_pending`]. That lets the despawn
//! notification still see its source.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::catalog::WorldCatalog;
use crate::entities::{Creature, EntityId, MapId, SpawnId};
use crate::host::LinkHost;
use crate::mechanics::{FollowDirective, LifeState, Timestamp, WorldCommand, WorldTransition};

/// The state of one map partition.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub catalog: WorldCatalog,
    pub map: MapId,
    pub time: Timestamp,

    /// All creature instances currently known to the map.
    pub creatures: HashMap<EntityId, Creature>,

    /// Persisted respawn timers by spawn.
    pub respawn_times: HashMap<SpawnId, Timestamp>,

    /// Pooled spawns currently selected by their pool.
    pub spawned_pool_members: HashSet<SpawnId>,

    pub encounter_in_progress: bool,
    pub dynamic_spawning: bool,

    /// Threat lists: creature -> hostiles it has threat on.
    pub threat: HashMap<EntityId, HashSet<EntityId>>,

    /// Active follow orders.
    pub motion: HashMap<EntityId, FollowDirective>,

    spawn_index: HashMap<SpawnId, EntityId>,
    journal: Vec<WorldCommand>,
    pending: Vec<WorldCommand>,
    /// Despawned creatures to drop on the next `apply_pending`.
    retired: Vec<EntityId>,
}

/// Serializable summary of a world, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSummary {
    pub map: MapId,
    pub time: Timestamp,
    pub alive: usize,
    pub dead: usize,
    pub pending_commands: usize,
}

impl WorldState {
    /// Create an empty world for one map of the catalog.
    pub fn new(catalog: WorldCatalog, map: MapId) -> Self {
        Self {
            catalog,
            map,
            ..Self::default()
        }
    }

    /// Add a creature to the world.
    pub fn add_creature(&mut self, creature: Creature) -> EntityId {
        let id = creature.id;
        if let Some(spawn) = creature.spawn_id {
            self.spawn_index.insert(spawn, id);
        }
        self.creatures.insert(id, creature);
        id
    }

    /// Instantiate a spawn table row of this map.
    ///
    /// Returns `None` if the row is unknown, belongs to another map, or
    /// already has an instance.
    pub fn spawn(&mut self, spawn: SpawnId) -> Option<EntityId> {
        if self.spawn_index.contains_key(&spawn) {
            return None;
        }
        let data = self.catalog.spawn(spawn)?;
        if data.map != self.map {
            return None;
        }
        let template = self.catalog.template(data.template)?;
        let creature = Creature::from_spawn(data, template);
        Some(self.add_creature(creature))
    }

    /// Drop a creature from the world entirely.
    pub fn remove_creature(&mut self, id: EntityId) -> Option<Creature> {
        let creature = self.creatures.remove(&id)?;
        if let Some(spawn) = creature.spawn_id {
            // The row may already belong to a newer instance.
            if self.spawn_index.get(&spawn) == Some(&id) {
                self.spawn_index.remove(&spawn);
            }
        }
        self.threat.remove(&id);
        self.motion.remove(&id);
        Some(creature)
    }

    /// Get creature by ID.
    pub fn get_creature(&self, id: EntityId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// Get mutable creature by ID.
    pub fn get_creature_mut(&mut self, id: EntityId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    /// Kill a creature outside of any link command.
    pub fn die(&mut self, id: EntityId) -> bool {
        self.apply_death(id)
    }

    /// Advance time by given seconds.
    pub fn advance_time(&mut self, secs: u64) {
        self.time = Timestamp(self.time.0.saturating_add(secs));
    }

    /// Every command received so far, in order.
    pub fn journal(&self) -> &[WorldCommand] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Commands whose subject is `id`.
    pub fn commands_for(&self, id: EntityId) -> Vec<WorldCommand> {
        self.journal
            .iter()
            .filter(|c| c.subject() == Some(id))
            .copied()
            .collect()
    }

    /// Respawn and despawn requests not yet applied.
    pub fn pending(&self) -> &[WorldCommand] {
        &self.pending
    }

    pub fn following(&self, id: EntityId) -> Option<FollowDirective> {
        self.motion.get(&id).copied()
    }

    pub fn threat_of(&self, id: EntityId) -> HashSet<EntityId> {
        self.threat.get(&id).cloned().unwrap_or_default()
    }

    /// Apply queued respawn/despawn requests, returning the transitions that
    /// actually happened. Requests that no longer make sense are dropped.
    ///
    /// Creatures retired by the previous call are removed first.
    pub fn apply_pending(&mut self) -> Vec<WorldTransition> {
        for id in std::mem::take(&mut self.retired) {
            self.remove_creature(id);
        }
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|command| match command {
                WorldCommand::ForceDespawn { who } => self.apply_despawn(who),
                WorldCommand::Respawn { who } => self.apply_revive(who),
                WorldCommand::RespawnSpawn { spawn } => self.apply_spawn_respawn(spawn),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> WorldSummary {
        let alive = self.creatures.values().filter(|c| c.is_alive()).count();
        WorldSummary {
            map: self.map,
            time: self.time,
            alive,
            dead: self.creatures.len() - alive,
            pending_commands: self.pending.len(),
        }
    }

    fn apply_death(&mut self, id: EntityId) -> bool {
        let now = self.time;
        let Some(creature) = self.creatures.get_mut(&id) else {
            return false;
        };
        if !creature.is_alive() {
            return false;
        }
        creature.life = LifeState::Corpse;
        creature.in_combat = false;
        creature.died_at = Some(now);
        if let Some(spawn) = creature.spawn_id {
            self.respawn_times
                .insert(spawn, now.after_secs(creature.respawn_delay));
        }
        self.threat.remove(&id);
        true
    }

    fn apply_despawn(&mut self, id: EntityId) -> Option<WorldTransition> {
        let now = self.time;
        let creature = self.creatures.get_mut(&id)?;
        if creature.is_despawned() {
            return None;
        }
        if creature.is_alive() {
            creature.died_at = Some(now);
        }
        creature.life = LifeState::Despawned;
        creature.in_combat = false;
        let creature_spawn = creature.spawn_id;
        if let Some(spawn) = creature_spawn {
            self.respawn_times
                .insert(spawn, now.after_secs(creature.respawn_delay));
        }
        self.threat.remove(&id);
        if self.dynamic_spawning {
            if let Some(spawn) = creature_spawn {
                self.spawn_index.remove(&spawn);
            }
            self.retired.push(id);
        }
        Some(WorldTransition::Despawned(id))
    }

    fn apply_revive(&mut self, id: EntityId) -> Option<WorldTransition> {
        let creature = self.creatures.get_mut(&id)?;
        if creature.is_alive() {
            return None;
        }
        creature.life = LifeState::Alive;
        creature.in_combat = false;
        creature.died_at = None;
        if let Some(spawn) = creature.spawn_id {
            self.respawn_times.remove(&spawn);
        }
        Some(WorldTransition::Respawned(id))
    }

    fn apply_spawn_respawn(&mut self, spawn: SpawnId) -> Option<WorldTransition> {
        if let Some(id) = self.spawn_index.get(&spawn).copied() {
            return self.apply_revive(id);
        }
        self.respawn_times.remove(&spawn);
        self.spawn(spawn).map(WorldTransition::Spawned)
    }
}

impl LinkHost for WorldState {
    fn catalog(&self) -> &WorldCatalog {
        &self.catalog
    }

    fn map_id(&self) -> MapId {
        self.map
    }

    fn now(&self) -> Timestamp {
        self.time
    }

    fn creature(&self, id: EntityId) -> Option<Creature> {
        self.creatures.get(&id).copied()
    }

    fn creature_by_spawn(&self, spawn: SpawnId) -> Option<Creature> {
        let id = self.spawn_index.get(&spawn)?;
        self.creatures.get(id).copied()
    }

    fn respawn_time(&self, spawn: SpawnId) -> Option<Timestamp> {
        self.respawn_times.get(&spawn).copied()
    }

    fn is_spawned_pool_member(&self, spawn: SpawnId) -> bool {
        self.spawned_pool_members.contains(&spawn)
    }

    fn is_encounter_in_progress(&self) -> bool {
        self.encounter_in_progress
    }

    fn uses_dynamic_spawning(&self) -> bool {
        self.dynamic_spawning
    }

    fn add_mutual_threat(&mut self, who: EntityId, hostile: EntityId) {
        self.journal.push(WorldCommand::AddThreat { who, hostile });
        self.threat.entry(who).or_default().insert(hostile);
        self.threat.entry(hostile).or_default().insert(who);
        for id in [who, hostile] {
            if let Some(creature) = self.creatures.get_mut(&id) {
                if creature.is_alive() {
                    creature.in_combat = true;
                }
            }
        }
    }

    fn trigger_combat_timer(&mut self, hostile: EntityId, who: EntityId) {
        self.journal
            .push(WorldCommand::TriggerCombatTimer { hostile, who });
    }

    fn attack_start(&mut self, who: EntityId, hostile: EntityId) -> bool {
        self.journal.push(WorldCommand::AttackStart { who, hostile });
        let Some(creature) = self.creatures.get_mut(&who) else {
            return false;
        };
        if !creature.is_alive() || creature.in_combat {
            return false;
        }
        creature.in_combat = true;
        self.threat.entry(who).or_default().insert(hostile);
        true
    }

    fn enter_evade_mode(&mut self, who: EntityId) -> bool {
        self.journal.push(WorldCommand::EnterEvadeMode { who });
        let Some(creature) = self.creatures.get_mut(&who) else {
            return false;
        };
        if !creature.is_alive() {
            return false;
        }
        creature.in_combat = false;
        self.threat.remove(&who);
        true
    }

    fn kill(&mut self, who: EntityId) -> bool {
        self.journal.push(WorldCommand::Kill { who });
        self.apply_death(who)
    }

    fn force_despawn(&mut self, who: EntityId) {
        let command = WorldCommand::ForceDespawn { who };
        self.journal.push(command);
        self.pending.push(command);
    }

    fn respawn(&mut self, who: EntityId) {
        let command = WorldCommand::Respawn { who };
        self.journal.push(command);
        self.pending.push(command);
    }

    fn respawn_spawn(&mut self, spawn: SpawnId) {
        let command = WorldCommand::RespawnSpawn { spawn };
        self.journal.push(command);
        self.pending.push(command);
    }

    fn move_follow(&mut self, who: EntityId, directive: FollowDirective) {
        self.journal.push(WorldCommand::MoveFollow { who, directive });
        self.motion.insert(who, directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Position, TemplateId};

    fn test_world() -> WorldState {
        let catalog = WorldCatalog::new()
            .with_template(TemplateId(1), 1.0, 30)
            .with_map(MapId(0))
            .with_spawn(SpawnId(1), TemplateId(1), MapId(0), Position::new(5.0, 5.0, 0.0));
        WorldState::new(catalog, MapId(0))
    }

    #[test]
    fn test_spawn_from_catalog() {
        let mut world = test_world();
        let id = world.spawn(SpawnId(1)).unwrap();

        let creature = world.creature(id).unwrap();
        assert_eq!(creature.spawn_id, Some(SpawnId(1)));
        assert_eq!(creature.respawn_delay, 30);
        assert_eq!(world.creature_by_spawn(SpawnId(1)).unwrap().id, id);

        // Only one instance per row.
        assert!(world.spawn(SpawnId(1)).is_none());
        assert!(world.spawn(SpawnId(99)).is_none());
    }

    #[test]
    fn test_kill_is_immediate_and_persists_timer() {
        let mut world = test_world();
        world.advance_time(100);
        let id = world.spawn(SpawnId(1)).unwrap();

        assert!(world.kill(id));
        assert!(!world.kill(id));
        assert!(world.creature(id).unwrap().is_corpse());
        assert_eq!(world.respawn_time(SpawnId(1)), Some(Timestamp(130)));
    }

    #[test]
    fn test_respawn_is_deferred() {
        let mut world = test_world();
        let id = world.spawn(SpawnId(1)).unwrap();
        world.die(id);

        world.respawn(id);
        assert!(!world.creature(id).unwrap().is_alive());
        assert_eq!(world.pending().len(), 1);

        let transitions = world.apply_pending();
        assert_eq!(transitions, vec![WorldTransition::Respawned(id)]);
        assert!(world.creature(id).unwrap().is_alive());
        assert!(world.respawn_time(SpawnId(1)).is_none());
    }

    #[test]
    fn test_dynamic_despawn_removes_and_spawn_system_recreates() {
        let mut world = test_world();
        world.dynamic_spawning = true;
        let id = world.spawn(SpawnId(1)).unwrap();

        world.force_despawn(id);
        assert_eq!(world.apply_pending(), vec![WorldTransition::Despawned(id)]);
        // Detached from its row, but still visible to the despawn notification.
        assert!(world.creature_by_spawn(SpawnId(1)).is_none());
        assert!(world.creature(id).unwrap().is_despawned());

        world.respawn_spawn(SpawnId(1));
        let transitions = world.apply_pending();
        assert_eq!(transitions.len(), 1);
        let WorldTransition::Spawned(new_id) = transitions[0] else {
            panic!("expected a fresh instance, got {:?}", transitions[0]);
        };
        assert_ne!(new_id, id);
        assert!(world.creature(new_id).unwrap().is_alive());
        assert!(world.creature(id).is_none());
        assert_eq!(world.creature_by_spawn(SpawnId(1)).unwrap().id, new_id);
    }

    #[test]
    fn test_attack_start_reports_transition_once() {
        let mut world = test_world();
        let id = world.spawn(SpawnId(1)).unwrap();
        let enemy = EntityId::new();

        assert!(world.attack_start(id, enemy));
        assert!(!world.attack_start(id, enemy));
        assert!(world.threat_of(id).contains(&enemy));
        assert_eq!(world.commands_for(id).len(), 2);
    }

    #[test]
    fn test_summary() {
        let mut world = test_world();
        let id = world.spawn(SpawnId(1)).unwrap();
        world.add_creature(Creature::new(TemplateId(1), MapId(0), Position::default()));
        world.die(id);

        let summary = world.summary();
        assert_eq!(summary.alive, 1);
        assert_eq!(summary.dead, 1);
    }
}
