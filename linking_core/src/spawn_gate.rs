//! Spawn gating - whether a linked creature may spawn given its master.

use world_rules::{Creature, LinkHost, Position, SpawnId};

use crate::descriptor::{LinkDescriptor, MasterRef};
use crate::flags::LinkFlags;
use crate::registry::LinkRegistry;
use crate::runtime::RuntimeIndex;

pub struct SpawnGate<'a> {
    registry: &'a LinkRegistry,
    index: &'a RuntimeIndex,
}

impl<'a> SpawnGate<'a> {
    pub fn new(registry: &'a LinkRegistry, index: &'a RuntimeIndex) -> Self {
        Self { registry, index }
    }

    /// Whether `candidate` may spawn now.
    ///
    /// Creatures without a spawn-gating link always may. A master that
    /// cannot be resolved never blocks.
    pub fn can_spawn<H: LinkHost + ?Sized>(&self, host: &H, candidate: &Creature) -> bool {
        let Some(descriptor) = self.registry.descriptor_for(candidate) else {
            return true;
        };
        let mut path: Vec<SpawnId> = candidate.spawn_id.into_iter().collect();
        let allowed = self.evaluate(host, descriptor, &candidate.home, &mut path);
        tracing::debug!(creature = %candidate.id, allowed, "spawn gate");
        allowed
    }

    /// Same as [`can_spawn`](Self::can_spawn), for a spawn table row that
    /// has no live instance yet.
    pub fn can_spawn_spawn_id<H: LinkHost + ?Sized>(&self, host: &H, spawn: SpawnId) -> bool {
        self.evaluate_spawn(host, spawn, &mut Vec::new())
    }

    fn evaluate_spawn<H: LinkHost + ?Sized>(
        &self,
        host: &H,
        spawn: SpawnId,
        path: &mut Vec<SpawnId>,
    ) -> bool {
        if path.contains(&spawn) {
            tracing::trace!(%spawn, "spawn gate cycle");
            return true;
        }
        let Some(data) = host.catalog().spawn(spawn) else {
            return true;
        };
        let Some(descriptor) = self.registry.lookup(data.template, Some(spawn), data.map) else {
            return true;
        };
        let position = data.position;

        path.push(spawn);
        let allowed = self.evaluate(host, descriptor, &position, path);
        path.pop();
        allowed
    }

    fn evaluate<H: LinkHost + ?Sized>(
        &self,
        host: &H,
        descriptor: &LinkDescriptor,
        origin: &Position,
        path: &mut Vec<SpawnId>,
    ) -> bool {
        if !descriptor.is_spawn_gated() {
            return true;
        }
        let flags = descriptor.flags;

        if descriptor.is_unscoped() {
            let Some(master) = descriptor.cached_master else {
                tracing::warn!(slave = %descriptor.slave, "map-wide spawn gate without a unique master");
                return false;
            };
            if flags.contains(LinkFlags::CANT_SPAWN_IF_BOSS_DEAD) {
                if host.is_encounter_in_progress() {
                    return false;
                }
                return self.is_respawn_ready(host, master, path);
            }
            if flags.contains(LinkFlags::CANT_SPAWN_IF_BOSS_ALIVE) {
                return !self.is_respawn_ready(host, master, path);
            }
            return true;
        }

        // Instance links always carry a cached master, so only template
        // masters are searched for locally.
        let MasterRef::Template(template) = descriptor.master else {
            return true;
        };
        // No local master, nothing to wait for.
        let Some(master) = self
            .index
            .nearest_master(host, template, origin, descriptor.search_range)
        else {
            return true;
        };
        if flags.contains(LinkFlags::CANT_SPAWN_IF_BOSS_DEAD) {
            master.is_alive()
        } else if flags.contains(LinkFlags::CANT_SPAWN_IF_BOSS_ALIVE) {
            !master.is_alive()
        } else {
            true
        }
    }

    /// Whether the master spawn would be up: its timer ran out, its own gate
    /// lets it spawn, and its pool (if any) picked it.
    fn is_respawn_ready<H: LinkHost + ?Sized>(
        &self,
        host: &H,
        spawn: SpawnId,
        path: &mut Vec<SpawnId>,
    ) -> bool {
        let timer_elapsed = host.respawn_time(spawn).map_or(true, |at| at <= host.now());
        if !timer_elapsed || !self.evaluate_spawn(host, spawn, path) {
            return false;
        }
        if host.catalog().pool_of(spawn).is_some() && !host.is_spawned_pool_member(spawn) {
            return false;
        }
        true
    }
}
