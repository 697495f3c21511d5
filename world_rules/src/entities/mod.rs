//! Entity identities and positions.

mod creature;

pub use creature::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Runtime identifier of a live creature instance.
///
/// Unlike [`SpawnId`], an entity id is never persisted: a creature that is
/// despawned and re-created by the spawn system gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an entity ID from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a nil/empty entity ID (useful for defaults).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identity of a creature template (the "kind" of a creature).
    TemplateId,
    "template"
);

numeric_id!(
    /// Persisted identity of one row of the spawn table.
    SpawnId,
    "spawn"
);

numeric_id!(
    /// Identity of a map. One simulation context runs exactly one map.
    MapId,
    "map"
);

numeric_id!(
    /// Identity of a spawn pool.
    PoolId,
    "pool"
);

/// A point in the world plus a facing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Facing in radians.
    #[serde(default)]
    pub orientation: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            orientation: 0.0,
        }
    }

    pub fn with_orientation(mut self, orientation: f32) -> Self {
        self.orientation = orientation;
        self
    }

    /// Squared distance on the ground plane.
    pub fn planar_distance_sq(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn planar_distance(&self, other: &Position) -> f32 {
        self.planar_distance_sq(other).sqrt()
    }
}
