//! # Entity Component Store
//!
//! A schema-driven ECS: component types are registered at load time with a
//! name and an internal storage type, and every entity keeps a short ordered
//! list of the components it actually has.
//!
//! ## Design Philosophy
//!
//! - All registries are owned by [`World`]
//! - Entity ids are sequential indices; id 0 is the permanent null entity
//! - A component value is a sum type checked against its declared schema at
//!   the single point of assignment

mod component;
mod entity;
mod registry;
mod world;

pub use component::{
    CompDef, Component, ComponentTypeId, ComponentValue, ConversionId, ConversionRate,
    InternalType, ItemPrice, ItemRate, Money, RoadConnect, RoadSpan,
};
pub use entity::{Entity, EntityDef, EntityId, EntityTypeId, Tick};
pub use registry::{size_of_internal_type, ComponentRegistry};
pub use world::World;
