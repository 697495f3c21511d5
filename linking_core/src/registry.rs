//! Link Registry - the validated, load-time store of link descriptors.

use std::collections::{HashMap, HashSet};
use world_rules::{Creature, MapId, SpawnId, TemplateId, WorldCatalog};

use crate::config::{InstanceLink, LinkingConfig, TemplateLink};
use crate::descriptor::{LinkDescriptor, LinkKey, MasterRef};
use crate::error::LinkError;
use crate::flags::LinkFlags;

/// A configuration row that did not make it into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLink {
    pub slave: LinkKey,
    pub master: MasterRef,
    pub reason: LinkError,
}

/// Outcome of a registry load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub template_links: usize,
    pub instance_links: usize,
    pub rejected: Vec<RejectedLink>,
}

impl LoadReport {
    pub fn accepted(&self) -> usize {
        self.template_links + self.instance_links
    }
}

/// Immutable store of link descriptors, addressed by template or by spawn.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    /// Template-scoped descriptors; one per map at most.
    by_template: HashMap<TemplateId, Vec<LinkDescriptor>>,

    /// Instance-scoped descriptors.
    by_spawn: HashMap<SpawnId, LinkDescriptor>,

    /// Templates referenced as master by some template-scoped link.
    master_templates: HashSet<TemplateId>,

    /// Spawns referenced as master by some instance-scoped link.
    master_spawns: HashSet<SpawnId>,
}

impl LinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration rows, validating every row
    /// against the catalog. Invalid rows are logged and skipped.
    pub fn load(config: &LinkingConfig, catalog: &WorldCatalog) -> (Self, LoadReport) {
        let mut registry = Self::new();
        let mut report = LoadReport::default();

        for row in &config.template_links {
            let slave = LinkKey::template(row.slave_template, row.map);
            let master = MasterRef::Template(row.master_template);
            match registry.insert_template_link(row, catalog) {
                Ok(()) => report.template_links += 1,
                Err(reason) => {
                    tracing::warn!(%slave, %master, %reason, "template link rejected");
                    report.rejected.push(RejectedLink {
                        slave,
                        master,
                        reason,
                    });
                }
            }
        }

        for row in &config.instance_links {
            let slave = LinkKey::instance(row.slave_spawn);
            let master = MasterRef::Instance(row.master_spawn);
            match registry.insert_instance_link(row, catalog) {
                Ok(()) => report.instance_links += 1,
                Err(reason) => {
                    tracing::warn!(%slave, %master, %reason, "instance link rejected");
                    report.rejected.push(RejectedLink {
                        slave,
                        master,
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            template_links = report.template_links,
            instance_links = report.instance_links,
            rejected = report.rejected.len(),
            "loaded creature links"
        );
        (registry, report)
    }

    fn insert_template_link(
        &mut self,
        row: &TemplateLink,
        catalog: &WorldCatalog,
    ) -> Result<(), LinkError> {
        let descriptor = validate_template_link(row, catalog)?;
        let per_map = self.by_template.entry(row.slave_template).or_default();
        if per_map.iter().any(|d| d.slave == descriptor.slave) {
            return Err(LinkError::DuplicateLink);
        }
        per_map.push(descriptor);
        self.master_templates.insert(row.master_template);
        Ok(())
    }

    fn insert_instance_link(
        &mut self,
        row: &InstanceLink,
        catalog: &WorldCatalog,
    ) -> Result<(), LinkError> {
        let descriptor = validate_instance_link(row, catalog)?;
        if self.by_spawn.contains_key(&row.slave_spawn) {
            return Err(LinkError::DuplicateLink);
        }
        self.by_spawn.insert(row.slave_spawn, descriptor);
        self.master_spawns.insert(row.master_spawn);
        Ok(())
    }

    /// Find the descriptor for a creature identity.
    ///
    /// An instance-scoped link wins over a template-scoped one.
    pub fn lookup(
        &self,
        template: TemplateId,
        spawn: Option<SpawnId>,
        map: MapId,
    ) -> Option<&LinkDescriptor> {
        if let Some(descriptor) = spawn.and_then(|s| self.by_spawn.get(&s)) {
            return Some(descriptor);
        }
        self.by_template
            .get(&template)?
            .iter()
            .find(|d| matches!(d.slave, LinkKey::TemplateScoped { map: m, .. } if m == map))
    }

    /// Descriptor of a live creature.
    pub fn descriptor_for(&self, creature: &Creature) -> Option<&LinkDescriptor> {
        self.lookup(creature.template, creature.spawn_id, creature.map)
    }

    /// Whether events of this creature can affect anything.
    ///
    /// True for masters (by template or by spawn) and for slaves whose own
    /// link reaches back to their master.
    pub fn is_event_source_candidate(&self, creature: &Creature) -> bool {
        if self.master_templates.contains(&creature.template) {
            return true;
        }
        if creature
            .spawn_id
            .is_some_and(|s| self.master_spawns.contains(&s))
        {
            return true;
        }
        self.descriptor_for(creature)
            .is_some_and(LinkDescriptor::has_reverse_flags)
    }

    /// Whether the template is a master of some template-scoped link.
    ///
    /// Only these masters are tracked by the runtime index.
    pub fn is_master_template(&self, template: TemplateId) -> bool {
        self.master_templates.contains(&template)
    }

    /// Whether the creature's spawning depends on a linked master.
    pub fn is_spawn_gated(&self, creature: &Creature) -> bool {
        self.descriptor_for(creature)
            .is_some_and(LinkDescriptor::is_spawn_gated)
    }

    /// Iterate all descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = &LinkDescriptor> {
        self.by_spawn
            .values()
            .chain(self.by_template.values().flatten())
    }

    /// Get the total number of descriptors.
    pub fn len(&self) -> usize {
        self.by_spawn.len() + self.by_template.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_template_link(
    row: &TemplateLink,
    catalog: &WorldCatalog,
) -> Result<LinkDescriptor, LinkError> {
    if catalog.template(row.slave_template).is_none() {
        return Err(LinkError::UnknownSlaveTemplate(row.slave_template));
    }
    if catalog.template(row.master_template).is_none() {
        return Err(LinkError::UnknownMasterTemplate(row.master_template));
    }
    if !catalog.has_map(row.map) {
        return Err(LinkError::UnknownMap(row.map));
    }

    let flags = row.flags.resolve()?;
    if flags.contains(LinkFlags::DESPAWN_ON_RESPAWN) && row.slave_template == row.master_template {
        return Err(LinkError::SelfDespawnOnRespawn);
    }

    let mut cached_master = None;
    if row.search_range == 0 && flags.intersects(LinkFlags::NEEDS_UNIQUE_MASTER) {
        let mut spawns = catalog.spawns_of(row.master_template, row.map).take(2);
        let first = spawns.next().ok_or(LinkError::MissingMaster {
            master: row.master_template,
            map: row.map,
        })?;
        if spawns.next().is_some() {
            return Err(LinkError::AmbiguousMaster {
                master: row.master_template,
                map: row.map,
            });
        }
        cached_master = Some(first.id);
    }

    Ok(LinkDescriptor {
        slave: LinkKey::template(row.slave_template, row.map),
        master: MasterRef::Template(row.master_template),
        flags,
        search_range: row.search_range,
        cached_master,
    })
}

fn validate_instance_link(
    row: &InstanceLink,
    catalog: &WorldCatalog,
) -> Result<LinkDescriptor, LinkError> {
    let slave = catalog
        .spawn(row.slave_spawn)
        .ok_or(LinkError::UnknownSlaveSpawn(row.slave_spawn))?;
    let master = catalog
        .spawn(row.master_spawn)
        .ok_or(LinkError::UnknownMasterSpawn(row.master_spawn))?;
    if slave.map != master.map {
        return Err(LinkError::CrossMapLink {
            slave_map: slave.map,
            master_map: master.map,
        });
    }

    let flags = row.flags.resolve()?;
    if flags.contains(LinkFlags::DESPAWN_ON_RESPAWN) && row.slave_spawn == row.master_spawn {
        return Err(LinkError::SelfDespawnOnRespawn);
    }

    Ok(LinkDescriptor {
        slave: LinkKey::instance(row.slave_spawn),
        master: MasterRef::Instance(row.master_spawn),
        flags,
        search_range: 0,
        cached_master: Some(row.master_spawn),
    })
}
