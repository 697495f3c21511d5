//! Static world data: creature templates, maps, the spawn table and spawn pools.
//!
//! The catalog is what link configuration is validated against. It is built
//! once and never changes while a simulation runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::entities::{MapId, PoolId, Position, SpawnId, TemplateId};

/// A creature template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureTemplate {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bounding_radius: f32,
    /// Default respawn delay in seconds.
    #[serde(default)]
    pub respawn_delay: u32,
}

/// A map the world knows about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: MapId,
    #[serde(default)]
    pub name: String,
}

/// One row of the spawn table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnData {
    pub id: SpawnId,
    pub template: TemplateId,
    pub map: MapId,
    pub position: Position,
    /// Overrides the template's respawn delay.
    #[serde(default)]
    pub respawn_delay: Option<u32>,
}

/// Pool membership of a spawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolMember {
    pub spawn: SpawnId,
    pub pool: PoolId,
}

/// Errors raised while reading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk layout of the catalog.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    templates: Vec<CreatureTemplate>,
    #[serde(default)]
    maps: Vec<MapInfo>,
    #[serde(default)]
    spawns: Vec<SpawnData>,
    #[serde(default)]
    pools: Vec<PoolMember>,
}

/// The static world catalog.
#[derive(Debug, Clone, Default)]
pub struct WorldCatalog {
    templates: HashMap<TemplateId, CreatureTemplate>,
    maps: HashMap<MapId, MapInfo>,
    /// Ordered so "first spawn of a template" is deterministic.
    spawns: BTreeMap<SpawnId, SpawnData>,
    pools: HashMap<SpawnId, PoolId>,
}

impl WorldCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for template in file.templates {
            catalog.add_template(template);
        }
        for map in file.maps {
            catalog.maps.insert(map.id, map);
        }
        for spawn in file.spawns {
            catalog.add_spawn(spawn);
        }
        for member in file.pools {
            catalog.pools.insert(member.spawn, member.pool);
        }
        tracing::info!(
            templates = catalog.templates.len(),
            maps = catalog.maps.len(),
            spawns = catalog.spawns.len(),
            "loaded world catalog"
        );
        Ok(catalog)
    }

    /// Read and parse a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn add_template(&mut self, template: CreatureTemplate) {
        self.templates.insert(template.id, template);
    }

    pub fn add_spawn(&mut self, spawn: SpawnData) {
        self.spawns.insert(spawn.id, spawn);
    }

    /// Add a template with the given bounding radius and respawn delay.
    pub fn with_template(mut self, id: TemplateId, bounding_radius: f32, respawn_delay: u32) -> Self {
        self.add_template(CreatureTemplate {
            id,
            name: String::new(),
            bounding_radius,
            respawn_delay,
        });
        self
    }

    pub fn with_map(mut self, id: MapId) -> Self {
        self.maps.insert(
            id,
            MapInfo {
                id,
                name: String::new(),
            },
        );
        self
    }

    pub fn with_spawn(mut self, id: SpawnId, template: TemplateId, map: MapId, position: Position) -> Self {
        self.add_spawn(SpawnData {
            id,
            template,
            map,
            position,
            respawn_delay: None,
        });
        self
    }

    pub fn with_pool_member(mut self, spawn: SpawnId, pool: PoolId) -> Self {
        self.pools.insert(spawn, pool);
        self
    }

    pub fn template(&self, id: TemplateId) -> Option<&CreatureTemplate> {
        self.templates.get(&id)
    }

    pub fn has_map(&self, id: MapId) -> bool {
        self.maps.contains_key(&id)
    }

    pub fn spawn(&self, id: SpawnId) -> Option<&SpawnData> {
        self.spawns.get(&id)
    }

    /// All spawn rows of a template on a map, in spawn id order.
    pub fn spawns_of(&self, template: TemplateId, map: MapId) -> impl Iterator<Item = &SpawnData> {
        self.spawns
            .values()
            .filter(move |s| s.template == template && s.map == map)
    }

    pub fn pool_of(&self, spawn: SpawnId) -> Option<PoolId> {
        self.pools.get(&spawn).copied()
    }
}
