//! # MERCANTILE Core
//!
//! The data model of the MERCANTILE economy simulation:
//! - Component types are declared by configuration, not by Rust types
//! - Each entity carries a sparse, ordered list of typed component values
//! - Inventories live in a pool and are addressed by stable handles, so two
//!   fused entities can observe the very same inventory
//!
//! ## Architecture Rules
//!
//! 1. **One world object** - every registry is a field of [`World`]
//! 2. **Stable indices** - entities, components and inventories are referred
//!    to by index, never by pointer
//! 3. **Clamp, don't fail** - inventory arithmetic never goes negative
//!
//! ## Example
//!
//! ```rust
//! use mercantile_core::{InternalType, World};
//!
//! let mut world = World::new();
//! let name = world.register_component_type("name", InternalType::Str, false).unwrap();
//! let item = world.register_entity_def("Item", None).unwrap();
//!
//! let ore = world.create_entity(item, "ore").unwrap();
//! world.set_component(ore, name, "Ore".into()).unwrap();
//! assert_eq!(world.find_item("Ore"), Some(ore));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod commodity;
pub mod ecs;
pub mod error;
pub mod inventory;

pub use commodity::{CommodityBucket, CommodityId, CommoditySet};
pub use ecs::{
    size_of_internal_type, CompDef, Component, ComponentRegistry, ComponentTypeId,
    ComponentValue, ConversionId, ConversionRate, Entity, EntityDef, EntityId, EntityTypeId,
    InternalType, ItemPrice, ItemRate, Money, RoadConnect, RoadSpan, Tick, World,
};
pub use error::{next_id, CoreError, CoreResult};
pub use inventory::{EscrowItem, InvItem, Inventory, InventoryId, InventoryPool, Quantity};
