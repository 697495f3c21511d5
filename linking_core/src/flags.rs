//! Link behaviour flags.

use crate::error::LinkError;

bitflags::bitflags! {
    /// Behaviours a link descriptor enables.
    ///
    /// `TO_*` flags and `FOLLOW` act in the reverse direction: the slave
    /// reaches back to its master.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LinkFlags: u16 {
        /// Slave joins the fight when the master aggroes.
        const AGGRO_ON_AGGRO = 0x0001;
        /// Master joins the fight when the slave aggroes.
        const TO_AGGRO_ON_AGGRO = 0x0002;
        /// Slave respawns when the master evades.
        const RESPAWN_ON_EVADE = 0x0004;
        /// Master respawns when the slave evades.
        const TO_RESPAWN_ON_EVADE = 0x0008;
        /// Slave despawns when the master dies.
        const DESPAWN_ON_DEATH = 0x0010;
        /// Slave dies when the master dies.
        const SELFKILL_ON_DEATH = 0x0020;
        /// Slave respawns when the master dies.
        const RESPAWN_ON_DEATH = 0x0040;
        /// Slave respawns when the master respawns.
        const RESPAWN_ON_RESPAWN = 0x0080;
        /// Slave despawns when the master respawns.
        const DESPAWN_ON_RESPAWN = 0x0100;
        /// Slave follows the master.
        const FOLLOW = 0x0200;
        /// Slave may only spawn while the master can be alive.
        const CANT_SPAWN_IF_BOSS_DEAD = 0x0400;
        /// Slave may only spawn while the master is dead.
        const CANT_SPAWN_IF_BOSS_ALIVE = 0x0800;
        /// Slave despawns when the master evades.
        const DESPAWN_ON_EVADE = 0x1000;
        /// Slave despawns when the master despawns.
        const DESPAWN_ON_DESPAWN = 0x2000;
        /// Slave evades when the master evades.
        const EVADE_ON_EVADE = 0x4000;
    }
}

impl LinkFlags {
    /// First bit outside the valid range.
    pub const INVALID_BIT: u32 = 0x8000;

    pub const SPAWN_GATE: Self =
        Self::CANT_SPAWN_IF_BOSS_DEAD.union(Self::CANT_SPAWN_IF_BOSS_ALIVE);

    /// Flags that act from slave to master.
    pub const REVERSE: Self = Self::TO_AGGRO_ON_AGGRO
        .union(Self::TO_RESPAWN_ON_EVADE)
        .union(Self::FOLLOW);

    /// Flags that respawn a slave.
    pub const RESPAWNING: Self = Self::RESPAWN_ON_EVADE
        .union(Self::RESPAWN_ON_DEATH)
        .union(Self::RESPAWN_ON_RESPAWN);

    /// Unscoped links with any of these must point at a unique master.
    pub const NEEDS_UNIQUE_MASTER: Self = Self::FOLLOW.union(Self::SPAWN_GATE);

    /// Validate a raw flag value as stored in configuration.
    pub fn validate(raw: u32) -> Result<Self, LinkError> {
        if raw == 0 {
            return Err(LinkError::EmptyFlags);
        }
        u16::try_from(raw)
            .ok()
            .and_then(Self::from_bits)
            .ok_or(LinkError::FlagsOutOfRange(raw))
    }

    /// Resolve a list of flag names such as `["AGGRO_ON_AGGRO", "FOLLOW"]`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, LinkError> {
        names.iter().try_fold(Self::empty(), |acc, name| {
            let name = name.as_ref().trim();
            Self::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| LinkError::UnknownFlagName(name.to_string()))
        })
    }

    pub fn gates_spawn(&self) -> bool {
        self.intersects(Self::SPAWN_GATE)
    }
}
