//! The contract between a simulation context and the creature linking subsystem.

use crate::catalog::WorldCatalog;
use crate::entities::{Creature, EntityId, MapId, SpawnId};
use crate::mechanics::{FollowDirective, Timestamp};

/// Services a simulation context (one map partition) provides to linking.
///
/// Lookups return creature snapshots by value; a `None` means the instance is
/// gone and any reference to it is stale.
///
/// Primitives returning `bool` act synchronously and report whether the
/// subject actually went through the transition (entered combat, evaded,
/// died). Respawn and despawn requests are fire-and-forget: their outcome is
/// reported later as a separate lifecycle notification.
pub trait LinkHost {
    fn catalog(&self) -> &WorldCatalog;

    /// The map this context simulates.
    fn map_id(&self) -> MapId;

    fn now(&self) -> Timestamp;

    fn creature(&self, id: EntityId) -> Option<Creature>;

    /// The live instance of a spawn table row, if any.
    fn creature_by_spawn(&self, spawn: SpawnId) -> Option<Creature>;

    /// Persisted respawn time of a spawn; `None` when no timer is pending.
    fn respawn_time(&self, spawn: SpawnId) -> Option<Timestamp>;

    /// Whether a pooled spawn is the member its pool currently selected.
    fn is_spawned_pool_member(&self, spawn: SpawnId) -> bool;

    fn is_encounter_in_progress(&self) -> bool;

    /// Whether dead or despawned creatures are recreated by the spawn system
    /// from their spawn id instead of being revived in place.
    fn uses_dynamic_spawning(&self) -> bool;

    /// Mutual threat between `who` and `hostile`, putting both in combat.
    fn add_mutual_threat(&mut self, who: EntityId, hostile: EntityId);

    fn trigger_combat_timer(&mut self, hostile: EntityId, who: EntityId);

    /// Start `who`'s engagement against `hostile`.
    fn attack_start(&mut self, who: EntityId, hostile: EntityId) -> bool;

    fn enter_evade_mode(&mut self, who: EntityId) -> bool;

    fn kill(&mut self, who: EntityId) -> bool;

    fn force_despawn(&mut self, who: EntityId);

    fn respawn(&mut self, who: EntityId);

    /// Ask the spawn system to bring a spawn table row back.
    fn respawn_spawn(&mut self, spawn: SpawnId);

    fn move_follow(&mut self, who: EntityId, directive: FollowDirective);
}
