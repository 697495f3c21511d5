//! Link manager and per-context entry points.
//!
//! [`LinkManager`] owns the current registry and swaps it atomically on
//! reload. Every simulation context holds a [`LinkContext`]: its own runtime
//! index plus a handle to the shared manager. Notifications take one registry
//! snapshot and use it for the whole call.

use arc_swap::ArcSwap;
use std::sync::Arc;
use world_rules::{Creature, EntityId, LinkHost, SpawnId, WorldCatalog, WorldTransition};

use crate::config::LinkingConfig;
use crate::flags::LinkFlags;
use crate::follow::set_following;
use crate::propagator::{EventPropagator, LinkEvent};
use crate::registry::{LinkRegistry, LoadReport};
use crate::runtime::RuntimeIndex;
use crate::spawn_gate::SpawnGate;

/// Process-wide holder of the link registry.
pub struct LinkManager {
    registry: ArcSwap<LinkRegistry>,
}

impl LinkManager {
    /// A manager with no links.
    pub fn new() -> Self {
        Self::with_registry(LinkRegistry::new())
    }

    pub fn with_registry(registry: LinkRegistry) -> Self {
        Self {
            registry: ArcSwap::from_pointee(registry),
        }
    }

    /// Build the registry from configuration.
    pub fn load(config: &LinkingConfig, catalog: &WorldCatalog) -> (Self, LoadReport) {
        let (registry, report) = LinkRegistry::load(config, catalog);
        (Self::with_registry(registry), report)
    }

    /// Replace the registry. Propagations already running keep the
    /// snapshot they started with.
    pub fn reload(&self, config: &LinkingConfig, catalog: &WorldCatalog) -> LoadReport {
        let (registry, report) = LinkRegistry::load(config, catalog);
        self.registry.store(Arc::new(registry));
        tracing::info!(
            accepted = report.accepted(),
            rejected = report.rejected.len(),
            "link registry reloaded"
        );
        report
    }

    /// The current registry snapshot.
    pub fn registry(&self) -> Arc<LinkRegistry> {
        self.registry.load_full()
    }
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Linking state of one simulation context.
pub struct LinkContext {
    manager: Arc<LinkManager>,
    index: RuntimeIndex,
}

impl LinkContext {
    pub fn new(manager: Arc<LinkManager>) -> Self {
        Self {
            manager,
            index: RuntimeIndex::new(),
        }
    }

    pub fn manager(&self) -> &Arc<LinkManager> {
        &self.manager
    }

    pub fn index(&self) -> &RuntimeIndex {
        &self.index
    }

    /// Register a creature that just entered the world.
    pub fn on_spawned(&mut self, creature: &Creature) {
        let registry = self.manager.registry();
        self.index.register_slave(&registry, creature);
        self.index.register_master(&registry, creature);
    }

    pub fn on_aggro<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId, hostile: EntityId) {
        self.dispatch(host, who, LinkEvent::Aggro { hostile });
    }

    pub fn on_evade<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId) {
        self.dispatch(host, who, LinkEvent::Evade);
    }

    pub fn on_death<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId) {
        self.dispatch(host, who, LinkEvent::Die);
    }

    pub fn on_respawn<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId) {
        self.dispatch(host, who, LinkEvent::Respawn);
    }

    pub fn on_despawn<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId) {
        self.dispatch(host, who, LinkEvent::Despawn);
    }

    /// Propagate an event with one registry snapshot.
    pub fn dispatch<H: LinkHost + ?Sized>(&self, host: &mut H, source: EntityId, event: LinkEvent) {
        let registry = self.manager.registry();
        EventPropagator::new(&registry, &self.index).propagate(host, source, event);
    }

    /// Feed a transition reported by the host back into linking.
    ///
    /// A fresh instance created by the spawn system is registered first and
    /// then treated as a respawn.
    pub fn notify<H: LinkHost + ?Sized>(&mut self, host: &mut H, transition: WorldTransition) {
        match transition {
            WorldTransition::Spawned(id) => {
                if let Some(creature) = host.creature(id) {
                    self.on_spawned(&creature);
                }
                self.on_respawn(host, id);
            }
            WorldTransition::Respawned(id) => self.on_respawn(host, id),
            WorldTransition::Despawned(id) => self.on_despawn(host, id),
        }
    }

    /// Whether `creature` may spawn now.
    pub fn on_spawn_attempt<H: LinkHost + ?Sized>(&self, host: &H, creature: &Creature) -> bool {
        let registry = self.manager.registry();
        SpawnGate::new(&registry, &self.index).can_spawn(host, creature)
    }

    /// Whether a spawn table row may be populated now.
    pub fn can_spawn_spawn_id<H: LinkHost + ?Sized>(&self, host: &H, spawn: SpawnId) -> bool {
        let registry = self.manager.registry();
        SpawnGate::new(&registry, &self.index).can_spawn_spawn_id(host, spawn)
    }

    /// Send a following creature back to its master, if it has one alive.
    pub fn try_follow_master<H: LinkHost + ?Sized>(&self, host: &mut H, who: EntityId) -> bool {
        let Some(creature) = host.creature(who) else {
            return false;
        };
        let registry = self.manager.registry();
        let Some(descriptor) = registry.descriptor_for(&creature) else {
            return false;
        };
        if !descriptor.flags.contains(LinkFlags::FOLLOW) {
            return false;
        }
        match self.index.locate_master(&*host, &creature, descriptor) {
            Some(master) if master.is_alive() => {
                set_following(host, &creature, &master);
                true
            }
            _ => false,
        }
    }

    /// Whether the creature takes part in linking at all.
    pub fn is_participant(&self, creature: &Creature) -> bool {
        let registry = self.manager.registry();
        registry.descriptor_for(creature).is_some() || registry.is_event_source_candidate(creature)
    }

    pub fn is_spawn_gated(&self, creature: &Creature) -> bool {
        self.manager.registry().is_spawn_gated(creature)
    }
}
