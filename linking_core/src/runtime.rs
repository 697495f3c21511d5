//! Runtime Index - live slaves grouped by link semantics, and live masters.
//!
//! One index belongs to one simulation context. Groups live in an arena and
//! are addressed by [`GroupId`]; members are resolved through the host on
//! every access and pruned when they no longer resolve.
//!
//! Propagation walks the index through `&self` while it recurses, so group
//! state and membership sit behind `RefCell`s. No borrow is ever held across
//! a call into the host.

use std::cell::RefCell;
use std::collections::HashMap;
use world_rules::{Creature, EntityId, LinkHost, Position, SpawnId, TemplateId};

use crate::descriptor::{LinkDescriptor, MasterRef};
use crate::flags::LinkFlags;
use crate::registry::LinkRegistry;

/// Index of a group in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// Whether a group is being processed by a propagation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupState {
    #[default]
    Idle,
    Active,
}

/// A live slave, by persisted spawn (preferred) and runtime id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlaveRef {
    pub spawn: Option<SpawnId>,
    pub entity: EntityId,
}

impl SlaveRef {
    pub fn of(creature: &Creature) -> Self {
        Self {
            spawn: creature.spawn_id,
            entity: creature.id,
        }
    }

    /// Resolve to the live instance, if it still exists.
    pub fn resolve<H: LinkHost + ?Sized>(&self, host: &H) -> Option<Creature> {
        match self.spawn {
            Some(spawn) => host.creature_by_spawn(spawn),
            None => host.creature(self.entity),
        }
    }
}

/// Live slaves sharing one master, flag set and search range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeGroup {
    pub master: MasterRef,
    pub flags: LinkFlags,
    pub search_range: u16,
    pub members: Vec<SlaveRef>,
    pub state: GroupState,
}

impl RuntimeGroup {
    fn new(descriptor: &LinkDescriptor) -> Self {
        Self {
            master: descriptor.master,
            flags: descriptor.flags,
            search_range: descriptor.search_range,
            members: Vec::new(),
            state: GroupState::Idle,
        }
    }

    fn holds(&self, descriptor: &LinkDescriptor) -> bool {
        self.flags == descriptor.flags && self.search_range == descriptor.search_range
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.members.iter().any(|m| m.entity == entity)
    }
}

/// A group marked Active; dropping it marks the group Idle again.
pub struct ActiveGroup<'a> {
    index: &'a RuntimeIndex,
    id: GroupId,
    pub flags: LinkFlags,
    pub search_range: u16,
}

impl ActiveGroup<'_> {
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Snapshot of the current members.
    pub fn members(&self) -> Vec<SlaveRef> {
        self.index.groups.borrow()[self.id.0].members.clone()
    }

    /// Remove members that no longer resolve.
    pub fn prune(&self, stale: &[SlaveRef]) {
        if stale.is_empty() {
            return;
        }
        let mut groups = self.index.groups.borrow_mut();
        groups[self.id.0].members.retain(|m| !stale.contains(m));
        tracing::trace!(group = self.id.0, pruned = stale.len(), "pruned stale slaves");
    }
}

impl Drop for ActiveGroup<'_> {
    fn drop(&mut self) {
        self.index.groups.borrow_mut()[self.id.0].state = GroupState::Idle;
    }
}

/// Live link state of one simulation context.
#[derive(Debug, Default)]
pub struct RuntimeIndex {
    groups: RefCell<Vec<RuntimeGroup>>,
    by_master: HashMap<MasterRef, Vec<GroupId>>,
    /// Master template -> live instances.
    masters: RefCell<HashMap<TemplateId, Vec<EntityId>>>,
}

impl RuntimeIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly spawned creature to the group matching its link.
    ///
    /// Returns the group, or `None` if the creature has no link or takes no
    /// part in linking. Registering the same creature twice is a no-op.
    pub fn register_slave(
        &mut self,
        registry: &LinkRegistry,
        creature: &Creature,
    ) -> Option<GroupId> {
        if creature.companion {
            return None;
        }
        let descriptor = registry.descriptor_for(creature)?;
        let groups = self.groups.get_mut();
        let ids = self.by_master.entry(descriptor.master).or_default();

        let existing = ids
            .iter()
            .copied()
            .find(|id| groups[id.0].holds(descriptor));
        let id = match existing {
            Some(id) => id,
            None => {
                let id = GroupId(groups.len());
                groups.push(RuntimeGroup::new(descriptor));
                ids.push(id);
                id
            }
        };

        let member = SlaveRef::of(creature);
        let group = &mut groups[id.0];
        if let Some(existing) = group
            .members
            .iter_mut()
            .find(|m| m.entity == member.entity || (m.spawn.is_some() && m.spawn == member.spawn))
        {
            *existing = member;
        } else {
            group.members.push(member);
        }
        Some(id)
    }

    /// Track a freshly spawned master instance.
    ///
    /// Only masters referenced by template are tracked; spawn-addressed
    /// masters are resolved directly through the host.
    pub fn register_master(&mut self, registry: &LinkRegistry, creature: &Creature) -> bool {
        if creature.companion || !registry.is_master_template(creature.template) {
            return false;
        }
        let instances = self
            .masters
            .get_mut()
            .entry(creature.template)
            .or_default();
        if !instances.contains(&creature.id) {
            instances.push(creature.id);
        }
        true
    }

    /// Groups whose master is `master`.
    pub fn group_ids(&self, master: &MasterRef) -> Vec<GroupId> {
        self.by_master.get(master).cloned().unwrap_or_default()
    }

    /// Copy of a group, for inspection.
    pub fn group(&self, id: GroupId) -> Option<RuntimeGroup> {
        self.groups.borrow().get(id.0).cloned()
    }

    /// Copies of every group whose master is `master`.
    pub fn groups_for(&self, master: &MasterRef) -> Vec<RuntimeGroup> {
        let groups = self.groups.borrow();
        self.group_ids(master)
            .into_iter()
            .map(|id| groups[id.0].clone())
            .collect()
    }

    /// Mark a group Active, unless it already is.
    pub fn try_activate(&self, id: GroupId) -> Option<ActiveGroup<'_>> {
        let mut groups = self.groups.borrow_mut();
        let group = groups.get_mut(id.0)?;
        if group.state == GroupState::Active {
            return None;
        }
        group.state = GroupState::Active;
        Some(ActiveGroup {
            index: self,
            id,
            flags: group.flags,
            search_range: group.search_range,
        })
    }

    /// Live instances of a master template, as last seen.
    pub fn master_instances(&self, template: TemplateId) -> Vec<EntityId> {
        self.masters
            .borrow()
            .get(&template)
            .cloned()
            .unwrap_or_default()
    }

    /// The closest live master instance of a template within `range` of
    /// `origin`. Instances that no longer resolve are dropped from the index.
    pub fn nearest_master<H: LinkHost + ?Sized>(
        &self,
        host: &H,
        template: TemplateId,
        origin: &Position,
        range: u16,
    ) -> Option<Creature> {
        let mut stale = Vec::new();
        let mut best: Option<(f32, Creature)> = None;

        for id in self.master_instances(template) {
            let Some(master) = host.creature(id) else {
                stale.push(id);
                continue;
            };
            if !in_link_range(&master.home, origin, range) {
                continue;
            }
            let distance = master.home.planar_distance_sq(origin);
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((distance, master));
            }
        }

        if !stale.is_empty() {
            if let Some(instances) = self.masters.borrow_mut().get_mut(&template) {
                instances.retain(|id| !stale.contains(id));
            }
        }
        best.map(|(_, master)| master)
    }

    /// Find the live master of a linked creature.
    pub fn locate_master<H: LinkHost + ?Sized>(
        &self,
        host: &H,
        slave: &Creature,
        descriptor: &LinkDescriptor,
    ) -> Option<Creature> {
        match descriptor.master {
            MasterRef::Template(template) => {
                self.nearest_master(host, template, &slave.home, descriptor.search_range)
            }
            MasterRef::Instance(spawn) => host.creature_by_spawn(spawn),
        }
    }
}

/// Whether two canonical positions are within a link's search range.
///
/// A range of 0 covers the whole map.
pub fn in_link_range(a: &Position, b: &Position, range: u16) -> bool {
    if range == 0 {
        return true;
    }
    let range = range as f32;
    a.planar_distance_sq(b) < range * range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinkingConfig, TemplateLink};
    use world_rules::{MapId, WorldCatalog, WorldState};

    const BOSS: TemplateId = TemplateId(1);
    const ADD: TemplateId = TemplateId(2);
    const MAP: MapId = MapId(0);

    fn setup() -> (LinkRegistry, WorldState) {
        let catalog = WorldCatalog::new()
            .with_template(BOSS, 1.0, 0)
            .with_template(ADD, 1.0, 0)
            .with_map(MAP);
        let config = LinkingConfig::new().with_template_link(
            TemplateLink::new(ADD, MAP, BOSS, LinkFlags::AGGRO_ON_AGGRO).with_search_range(50),
        );
        let (registry, _) = LinkRegistry::load(&config, &catalog);
        (registry, WorldState::new(catalog, MAP))
    }

    fn add_at(world: &mut WorldState, template: TemplateId, x: f32) -> Creature {
        let id = world.add_creature(Creature::new(template, MAP, Position::new(x, 0.0, 0.0)));
        world.creature(id).unwrap()
    }

    #[test]
    fn test_register_slave_creates_group_once() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let a = add_at(&mut world, ADD, 0.0);
        let b = add_at(&mut world, ADD, 1.0);

        let first = index.register_slave(&registry, &a).unwrap();
        let second = index.register_slave(&registry, &b).unwrap();
        assert_eq!(first, second);
        index.register_slave(&registry, &a);

        let groups = index.groups_for(&MasterRef::Template(BOSS));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
        assert!(groups[0].contains(a.id));
        assert_eq!(groups[0].search_range, 50);
    }

    #[test]
    fn test_unlinked_and_companions_skipped() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let boss = add_at(&mut world, BOSS, 0.0);
        let pet = add_at(&mut world, ADD, 0.0).companion();
        let pet_boss = add_at(&mut world, BOSS, 0.0).companion();

        assert!(index.register_slave(&registry, &boss).is_none());
        assert!(index.register_slave(&registry, &pet).is_none());
        assert!(!index.register_master(&registry, &pet_boss));
    }

    #[test]
    fn test_register_master_is_idempotent() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let boss = add_at(&mut world, BOSS, 0.0);
        let add = add_at(&mut world, ADD, 0.0);

        assert!(index.register_master(&registry, &boss));
        assert!(index.register_master(&registry, &boss));
        assert!(!index.register_master(&registry, &add));
        assert_eq!(index.master_instances(BOSS), vec![boss.id]);
    }

    #[test]
    fn test_active_guard_released_on_drop() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let add = add_at(&mut world, ADD, 0.0);
        let id = index.register_slave(&registry, &add).unwrap();

        {
            let active = index.try_activate(id).unwrap();
            assert_eq!(index.group(id).unwrap().state, GroupState::Active);
            assert!(index.try_activate(id).is_none());
            assert_eq!(active.members().len(), 1);
        }

        assert_eq!(index.group(id).unwrap().state, GroupState::Idle);
        assert!(index.try_activate(id).is_some());
    }

    #[test]
    fn test_prune_removes_only_stale() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let a = add_at(&mut world, ADD, 0.0);
        let b = add_at(&mut world, ADD, 0.0);
        let id = index.register_slave(&registry, &a).unwrap();
        index.register_slave(&registry, &b);

        let active = index.try_activate(id).unwrap();
        active.prune(&[SlaveRef::of(&a)]);
        drop(active);

        let group = index.group(id).unwrap();
        assert!(!group.contains(a.id));
        assert!(group.contains(b.id));
    }

    #[test]
    fn test_nearest_master_prunes_and_picks_closest() {
        let (registry, mut world) = setup();
        let mut index = RuntimeIndex::new();
        let far = add_at(&mut world, BOSS, 40.0);
        let near = add_at(&mut world, BOSS, 10.0);
        let gone = add_at(&mut world, BOSS, 1.0);
        let outside = add_at(&mut world, BOSS, 80.0);
        for boss in [&far, &near, &gone, &outside] {
            index.register_master(&registry, boss);
        }
        world.remove_creature(gone.id);

        let origin = Position::new(0.0, 0.0, 0.0);
        let found = index.nearest_master(&world, BOSS, &origin, 50).unwrap();
        assert_eq!(found.id, near.id);
        assert!(!index.master_instances(BOSS).contains(&gone.id));

        let found = index.nearest_master(&world, BOSS, &Position::new(100.0, 0.0, 0.0), 30);
        assert_eq!(found.unwrap().id, outside.id);
        assert!(index.nearest_master(&world, BOSS, &Position::new(300.0, 0.0, 0.0), 30).is_none());
    }

    #[test]
    fn test_in_link_range() {
        let origin = Position::new(0.0, 0.0, 0.0);
        assert!(in_link_range(&origin, &Position::new(1000.0, 0.0, 0.0), 0));
        assert!(in_link_range(&origin, &Position::new(49.0, 0.0, 0.0), 50));
        assert!(!in_link_range(&origin, &Position::new(50.0, 0.0, 0.0), 50));
    }
}
