//! # World Rules
//!
//! The world-side vocabulary shared by the simulation and the creature linking
//! subsystem: identities, creature records, the static world catalog and the
//! [`LinkHost`] contract the simulation fulfils.
//!
//! This crate does not simulate movement, combat or persistence. It describes
//! the state those systems expose and ships [`WorldState`], a single-map
//! in-memory host that records issued commands instead of executing them.

pub mod catalog;
pub mod entities;
pub mod host;
pub mod mechanics;
pub mod world_state;

pub use catalog::*;
pub use entities::*;
pub use host::*;
pub use mechanics::*;
pub use world_state::*;
