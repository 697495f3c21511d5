//! Link configuration records and their TOML representation.
//!
//! ```toml
//! [[template_link]]
//! slave_template = 11
//! map = 0
//! master_template = 10
//! flags = ["AGGRO_ON_AGGRO", "RESPAWN_ON_EVADE"]
//! search_range = 30
//!
//! [[instance_link]]
//! slave_spawn = 501
//! master_spawn = 500
//! flags = 0x0010
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use world_rules::{MapId, SpawnId, TemplateId};

use crate::error::{ConfigError, LinkError};
use crate::flags::LinkFlags;

/// Flags as written in configuration: a raw number or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagSpec {
    Bits(u32),
    Names(Vec<String>),
}

impl FlagSpec {
    /// Resolve and validate the flags.
    pub fn resolve(&self) -> Result<LinkFlags, LinkError> {
        match self {
            FlagSpec::Bits(bits) => LinkFlags::validate(*bits),
            FlagSpec::Names(names) => {
                let flags = LinkFlags::from_names(names)?;
                LinkFlags::validate(flags.bits() as u32)
            }
        }
    }
}

impl From<LinkFlags> for FlagSpec {
    fn from(flags: LinkFlags) -> Self {
        FlagSpec::Bits(flags.bits() as u32)
    }
}

/// A link for every instance of a template on one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLink {
    pub slave_template: TemplateId,
    pub map: MapId,
    pub master_template: TemplateId,
    pub flags: FlagSpec,
    /// 0 means map-wide.
    #[serde(default)]
    pub search_range: u16,
}

impl TemplateLink {
    pub fn new(
        slave_template: TemplateId,
        map: MapId,
        master_template: TemplateId,
        flags: impl Into<FlagSpec>,
    ) -> Self {
        Self {
            slave_template,
            map,
            master_template,
            flags: flags.into(),
            search_range: 0,
        }
    }

    pub fn with_search_range(mut self, range: u16) -> Self {
        self.search_range = range;
        self
    }
}

/// A link between two specific spawns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceLink {
    pub slave_spawn: SpawnId,
    pub master_spawn: SpawnId,
    pub flags: FlagSpec,
}

impl InstanceLink {
    pub fn new(slave_spawn: SpawnId, master_spawn: SpawnId, flags: impl Into<FlagSpec>) -> Self {
        Self {
            slave_spawn,
            master_spawn,
            flags: flags.into(),
        }
    }
}

/// All link rows of one configuration load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkingConfig {
    #[serde(default, rename = "template_link")]
    pub template_links: Vec<TemplateLink>,

    #[serde(default, rename = "instance_link")]
    pub instance_links: Vec<InstanceLink>,
}

impl LinkingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_template_link(mut self, link: TemplateLink) -> Self {
        self.template_links.push(link);
        self
    }

    pub fn with_instance_link(mut self, link: InstanceLink) -> Self {
        self.instance_links.push(link);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config = LinkingConfig::from_toml_str(
            r#"
            [[template_link]]
            slave_template = 11
            map = 0
            master_template = 10
            flags = ["AGGRO_ON_AGGRO", "RESPAWN_ON_EVADE"]
            search_range = 30

            [[template_link]]
            slave_template = 12
            map = 0
            master_template = 10
            flags = 0x0200

            [[instance_link]]
            slave_spawn = 501
            master_spawn = 500
            flags = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.template_links.len(), 2);
        assert_eq!(config.instance_links.len(), 1);

        let first = &config.template_links[0];
        assert_eq!(first.search_range, 30);
        assert_eq!(
            first.flags.resolve().unwrap(),
            LinkFlags::AGGRO_ON_AGGRO | LinkFlags::RESPAWN_ON_EVADE
        );
        assert_eq!(config.template_links[1].search_range, 0);
        assert_eq!(
            config.template_links[1].flags.resolve().unwrap(),
            LinkFlags::FOLLOW
        );
        assert_eq!(
            config.instance_links[0].flags.resolve().unwrap(),
            LinkFlags::DESPAWN_ON_DEATH
        );
    }

    #[test]
    fn test_empty_document() {
        let config = LinkingConfig::from_toml_str("").unwrap();
        assert_eq!(config, LinkingConfig::default());
    }

    #[test]
    fn test_malformed_document() {
        let err = LinkingConfig::from_toml_str("[[template_link]]\nmap = \"zero\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = LinkingConfig::load("/nonexistent/links.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_empty_name_list_is_rejected() {
        assert_eq!(FlagSpec::Names(vec![]).resolve(), Err(LinkError::EmptyFlags));
    }
}
