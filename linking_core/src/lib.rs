//! # Linking Core
//!
//! Creature linking for a world simulation. Creatures are linked to a master
//! either by template (every instance of a kind on a map) or by spawn (one
//! specific spawn table row). Lifecycle events of a master fan out to its
//! slaves, some slaves reach back to their master, and spawn-gated slaves only
//! appear while their master is dead or alive.
//!
//! ## Core Components
//!
//! - **registry**: Validated link descriptors, loaded from [`LinkingConfig`]
//! - **runtime**: Live slaves grouped by master, and live master instances
//! - **propagator**: Event fan-out with a per-group reentrancy guard
//! - **spawn_gate**: Whether a linked creature may spawn right now
//! - **follow**: Formation geometry for followers
//! - **manager**: Reloadable registry and the per-context entry points
//!
//! The crate never drives the simulation. Hosts implement
//! [`world_rules::LinkHost`] and report lifecycle transitions to a
//! [`LinkContext`].

pub mod config;
pub mod descriptor;
pub mod error;
pub mod flags;
pub mod follow;
pub mod manager;
pub mod propagator;
pub mod registry;
pub mod runtime;
pub mod spawn_gate;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use flags::*;
pub use follow::*;
pub use manager::*;
pub use propagator::*;
pub use registry::*;
pub use runtime::*;
pub use spawn_gate::*;
