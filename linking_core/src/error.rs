//! Error types.

use thiserror::Error;
use world_rules::{MapId, SpawnId, TemplateId};

/// Why a configuration row was rejected at load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("slave template {0} does not exist")]
    UnknownSlaveTemplate(TemplateId),

    #[error("master template {0} does not exist")]
    UnknownMasterTemplate(TemplateId),

    #[error("map {0} does not exist")]
    UnknownMap(MapId),

    #[error("slave {0} does not exist")]
    UnknownSlaveSpawn(SpawnId),

    #[error("master {0} does not exist")]
    UnknownMasterSpawn(SpawnId),

    #[error("slave is on {slave_map} but master is on {master_map}")]
    CrossMapLink { slave_map: MapId, master_map: MapId },

    #[error("flags are empty")]
    EmptyFlags,

    #[error("flags {0:#06x} are outside the valid range")]
    FlagsOutOfRange(u32),

    #[error("unknown flag name '{0}'")]
    UnknownFlagName(String),

    #[error("DESPAWN_ON_RESPAWN on a link to itself is pointless")]
    SelfDespawnOnRespawn,

    #[error("no spawn of master {master} on {map} for an unscoped follow/spawn link")]
    MissingMaster { master: TemplateId, map: MapId },

    #[error("master {master} is not unique on {map} for an unscoped follow/spawn link")]
    AmbiguousMaster { master: TemplateId, map: MapId },

    #[error("slave already has a link")]
    DuplicateLink,
}

/// Errors raised while reading link configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read link configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed link configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
