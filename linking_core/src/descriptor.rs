//! Link descriptors - the immutable relationship unit.

use serde::{Deserialize, Serialize};
use world_rules::{Creature, MapId, SpawnId, TemplateId};

use crate::flags::LinkFlags;

/// Which creatures a descriptor applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKey {
    /// Every instance of a template on one map.
    TemplateScoped { template: TemplateId, map: MapId },

    /// Exactly one spawn table row.
    InstanceScoped { spawn: SpawnId },
}

impl LinkKey {
    pub fn template(template: TemplateId, map: MapId) -> Self {
        LinkKey::TemplateScoped { template, map }
    }

    pub fn instance(spawn: SpawnId) -> Self {
        LinkKey::InstanceScoped { spawn }
    }

    /// Whether this key addresses the given creature.
    pub fn matches(&self, creature: &Creature) -> bool {
        match *self {
            LinkKey::TemplateScoped { template, map } => {
                creature.template == template && creature.map == map
            }
            LinkKey::InstanceScoped { spawn } => creature.spawn_id == Some(spawn),
        }
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKey::TemplateScoped { template, map } => write!(f, "{}@{}", template, map),
            LinkKey::InstanceScoped { spawn } => write!(f, "{}", spawn),
        }
    }
}

/// The master side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MasterRef {
    /// Any live instance of the template (restricted by search range).
    Template(TemplateId),

    /// One specific spawn.
    Instance(SpawnId),
}

impl MasterRef {
    /// Whether the creature is addressed by this master reference.
    pub fn matches(&self, creature: &Creature) -> bool {
        match *self {
            MasterRef::Template(template) => creature.template == template,
            MasterRef::Instance(spawn) => creature.spawn_id == Some(spawn),
        }
    }
}

impl std::fmt::Display for MasterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterRef::Template(template) => write!(f, "{}", template),
            MasterRef::Instance(spawn) => write!(f, "{}", spawn),
        }
    }
}

/// A validated link between a slave and its master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDescriptor {
    pub slave: LinkKey,
    pub master: MasterRef,
    pub flags: LinkFlags,
    /// 0 means map-wide.
    pub search_range: u16,
    /// The master's spawn, when it is known to be unique.
    pub cached_master: Option<SpawnId>,
}

impl LinkDescriptor {
    pub fn is_instance_scoped(&self) -> bool {
        matches!(self.slave, LinkKey::InstanceScoped { .. })
    }

    pub fn is_unscoped(&self) -> bool {
        self.search_range == 0
    }

    /// Whether this link can block its slave from spawning.
    ///
    /// Needs a gating flag plus a way to find the master: either the cached
    /// unique spawn or a search range for a local lookup.
    pub fn is_spawn_gated(&self) -> bool {
        self.flags.gates_spawn() && (self.cached_master.is_some() || self.search_range > 0)
    }

    /// Whether the slave reaches back to its master on some event.
    pub fn has_reverse_flags(&self) -> bool {
        self.flags.intersects(LinkFlags::REVERSE)
    }
}
