//! Event propagation between linked creatures.
//!
//! A lifecycle event of a source creature fans out to the slaves whose groups
//! are keyed by the source, then optionally reaches back to the source's own
//! master. Host primitives that transition a creature synchronously (combat
//! start, evade, kill) chain into a nested propagation for that creature; the
//! per-group Active guard keeps the recursion bounded.

use world_rules::{Creature, EntityId, LinkHost};

use crate::descriptor::MasterRef;
use crate::flags::LinkFlags;
use crate::follow::set_following;
use crate::registry::LinkRegistry;
use crate::runtime::{in_link_range, GroupId, RuntimeIndex};

/// A lifecycle event raised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Aggro { hostile: EntityId },
    Evade,
    Die,
    Respawn,
    Despawn,
}

impl LinkEvent {
    /// Flags that make a slave react to this event of its master.
    pub fn slave_mask(&self) -> LinkFlags {
        match self {
            LinkEvent::Aggro { .. } => LinkFlags::AGGRO_ON_AGGRO,
            LinkEvent::Evade => {
                LinkFlags::RESPAWN_ON_EVADE | LinkFlags::DESPAWN_ON_EVADE | LinkFlags::EVADE_ON_EVADE
            }
            LinkEvent::Die => {
                LinkFlags::DESPAWN_ON_DEATH
                    | LinkFlags::SELFKILL_ON_DEATH
                    | LinkFlags::RESPAWN_ON_DEATH
                    | LinkFlags::FOLLOW
            }
            LinkEvent::Respawn => {
                LinkFlags::RESPAWN_ON_RESPAWN | LinkFlags::DESPAWN_ON_RESPAWN | LinkFlags::FOLLOW
            }
            LinkEvent::Despawn => LinkFlags::DESPAWN_ON_DESPAWN,
        }
    }

    /// The flag that makes a slave act on its master for this event.
    pub fn reverse_flag(&self) -> Option<LinkFlags> {
        match self {
            LinkEvent::Aggro { .. } => Some(LinkFlags::TO_AGGRO_ON_AGGRO),
            LinkEvent::Evade => Some(LinkFlags::TO_RESPAWN_ON_EVADE),
            LinkEvent::Respawn => Some(LinkFlags::FOLLOW),
            LinkEvent::Die | LinkEvent::Despawn => None,
        }
    }
}

/// Runs one notification against a registry snapshot and a runtime index.
pub struct EventPropagator<'a> {
    registry: &'a LinkRegistry,
    index: &'a RuntimeIndex,
}

impl<'a> EventPropagator<'a> {
    pub fn new(registry: &'a LinkRegistry, index: &'a RuntimeIndex) -> Self {
        Self { registry, index }
    }

    /// Propagate `event` of `source` to its linked creatures.
    ///
    /// Sources that are gone, player-controlled, or take no part in any link
    /// are ignored.
    pub fn propagate<H: LinkHost + ?Sized>(&self, host: &mut H, source: EntityId, event: LinkEvent) {
        let Some(creature) = host.creature(source) else {
            tracing::trace!(%source, ?event, "event source is gone");
            return;
        };
        if creature.player_controlled || !self.registry.is_event_source_candidate(&creature) {
            return;
        }
        tracing::debug!(%source, template = %creature.template, ?event, "propagating");

        let mut keys = vec![MasterRef::Template(creature.template)];
        if let Some(spawn) = creature.spawn_id {
            keys.push(MasterRef::Instance(spawn));
        }
        for key in keys {
            for id in self.index.group_ids(&key) {
                self.process_group(host, &creature, id, event);
            }
        }

        // Slave actions may have changed the source.
        if let Some(creature) = host.creature(source) {
            self.process_master(host, &creature, event);
        }
    }

    fn process_group<H: LinkHost + ?Sized>(
        &self,
        host: &mut H,
        source: &Creature,
        id: GroupId,
        event: LinkEvent,
    ) {
        let Some(group) = self.index.try_activate(id) else {
            tracing::debug!(group = ?id, ?event, "group already active, skipped");
            return;
        };
        let mut flags = group.flags & event.slave_mask();
        if flags.is_empty() {
            return;
        }

        // With dynamic spawning, dead slaves are brought back by the spawn
        // system instead of the per-member respawn actions.
        let mut respawn_via_spawn_system = LinkFlags::empty();
        if host.uses_dynamic_spawning() {
            respawn_via_spawn_system = flags & LinkFlags::RESPAWNING;
            flags.remove(LinkFlags::RESPAWNING);
        }

        let mut stale = Vec::new();
        for member in group.members() {
            let slave = member.resolve(&*host);
            if !respawn_via_spawn_system.is_empty() && slave.map_or(true, |s| !s.is_alive()) {
                if let Some(spawn) = member.spawn {
                    // Respawn-on-respawn waits for the member's own delay.
                    let now = host.now();
                    let ready = event != LinkEvent::Respawn
                        || match slave {
                            Some(slave) => slave.respawn_delay_elapsed(now),
                            None => host.respawn_time(spawn).map_or(true, |at| at <= now),
                        };
                    if ready {
                        host.respawn_spawn(spawn);
                    }
                }
            }
            let Some(slave) = slave else {
                stale.push(member);
                continue;
            };
            if slave.companion || !in_link_range(&slave.home, &source.home, group.search_range) {
                continue;
            }
            self.apply_to_slave(host, source, slave, flags, event);
        }
        group.prune(&stale);
    }

    fn apply_to_slave<H: LinkHost + ?Sized>(
        &self,
        host: &mut H,
        source: &Creature,
        mut slave: Creature,
        flags: LinkFlags,
        event: LinkEvent,
    ) {
        match event {
            LinkEvent::Aggro { hostile } => {
                if flags.contains(LinkFlags::AGGRO_ON_AGGRO) && !slave.player_controlled {
                    self.engage(host, &slave, hostile);
                }
            }
            LinkEvent::Evade => {
                if flags.contains(LinkFlags::DESPAWN_ON_EVADE) && slave.is_alive() {
                    host.force_despawn(slave.id);
                }
                if flags.contains(LinkFlags::RESPAWN_ON_EVADE) && !slave.is_alive() {
                    host.respawn(slave.id);
                }
                if flags.contains(LinkFlags::EVADE_ON_EVADE)
                    && slave.is_alive()
                    && host.enter_evade_mode(slave.id)
                {
                    self.propagate(host, slave.id, LinkEvent::Evade);
                }
            }
            LinkEvent::Die => {
                if flags.contains(LinkFlags::SELFKILL_ON_DEATH)
                    && slave.is_alive()
                    && host.kill(slave.id)
                {
                    self.propagate(host, slave.id, LinkEvent::Die);
                    match host.creature(slave.id) {
                        Some(current) => slave = current,
                        None => return,
                    }
                }
                if flags.contains(LinkFlags::DESPAWN_ON_DEATH) && slave.is_alive() {
                    host.force_despawn(slave.id);
                }
                if flags.contains(LinkFlags::RESPAWN_ON_DEATH) && !slave.is_alive() {
                    host.respawn(slave.id);
                }
                self.follow_source(host, &slave, source, flags);
            }
            LinkEvent::Respawn => {
                if flags.contains(LinkFlags::RESPAWN_ON_RESPAWN)
                    && !slave.is_alive()
                    && slave.respawn_delay_elapsed(host.now())
                {
                    host.respawn(slave.id);
                }
                if flags.contains(LinkFlags::DESPAWN_ON_RESPAWN) && slave.is_alive() {
                    host.force_despawn(slave.id);
                }
                self.follow_source(host, &slave, source, flags);
            }
            LinkEvent::Despawn => {
                if flags.contains(LinkFlags::DESPAWN_ON_DESPAWN) && !slave.is_despawned() {
                    host.force_despawn(slave.id);
                }
            }
        }
    }

    fn follow_source<H: LinkHost + ?Sized>(
        &self,
        host: &mut H,
        slave: &Creature,
        source: &Creature,
        flags: LinkFlags,
    ) {
        if flags.contains(LinkFlags::FOLLOW) && slave.is_alive() && !slave.in_combat {
            set_following(host, slave, source);
        }
    }

    fn process_master<H: LinkHost + ?Sized>(&self, host: &mut H, source: &Creature, event: LinkEvent) {
        let Some(reverse) = event.reverse_flag() else {
            return;
        };
        let Some(descriptor) = self.registry.descriptor_for(source) else {
            return;
        };
        if !descriptor.flags.intersects(reverse) {
            return;
        }

        let master = self.index.locate_master(&*host, source, descriptor);

        if event == LinkEvent::Evade
            && host.uses_dynamic_spawning()
            && master.map_or(true, |m| !m.is_alive())
        {
            let spawn = descriptor
                .cached_master
                .or_else(|| master.and_then(|m| m.spawn_id));
            if let Some(spawn) = spawn {
                tracing::debug!(source = %source.id, %spawn, "respawning master via spawn system");
                host.respawn_spawn(spawn);
            }
            return;
        }

        let Some(master) = master else {
            tracing::trace!(source = %source.id, master = %descriptor.master, "no live master");
            return;
        };
        match event {
            LinkEvent::Aggro { hostile } => {
                if !master.player_controlled {
                    self.engage(host, &master, hostile);
                }
            }
            LinkEvent::Evade => {
                if !master.is_alive() {
                    host.respawn(master.id);
                }
            }
            LinkEvent::Respawn => {
                if master.is_alive() {
                    set_following(host, source, &master);
                }
            }
            LinkEvent::Die | LinkEvent::Despawn => {}
        }
    }

    /// Bring `who` into the fight against `hostile`.
    fn engage<H: LinkHost + ?Sized>(&self, host: &mut H, who: &Creature, hostile: EntityId) {
        if who.in_combat {
            host.add_mutual_threat(who.id, hostile);
            host.trigger_combat_timer(hostile, who.id);
        } else if host.attack_start(who.id, hostile) {
            self.propagate(host, who.id, LinkEvent::Aggro { hostile });
        }
    }
}
