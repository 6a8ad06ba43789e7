//! # Entity Management
//!
//! Entities are rows of the world's entity table. The id is the row index,
//! handed out sequentially and never reused within a session.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::component::{CompDef, Component, ComponentTypeId, ComponentValue};
use crate::inventory::InventoryId;

/// Simulation time in ticks.
pub type Tick = u32;

/// Unique identifier for an entity.
///
/// The id is the entity's index in the world table. Id 0 is reserved for
/// the null entity and doubles as "no reference" in component payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// The null entity.
    pub const NULL: Self = Self(0);

    /// Creates an entity id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the index into the entity table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks if this is the null entity.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an entity archetype ([`EntityDef`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityTypeId(u32);

impl EntityTypeId {
    /// Creates a type id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the index into the entity-def table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named entity archetype.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Index in the entity-def table.
    pub id: EntityTypeId,
    /// Type name used by configuration.
    pub name: String,
    /// Id-valued component naming the entity whose inventory this type
    /// shares after loading.
    pub fused_inventory: Option<ComponentTypeId>,
}

/// A row of the entity table.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Stable id, equal to the row index.
    pub id: EntityId,
    /// Archetype, `None` for the built-in null and sink entities.
    pub type_id: Option<EntityTypeId>,
    /// Debug name.
    pub name: String,
    /// Tick at which the entity was created.
    pub born: Tick,
    /// Reserved for soft deletion; the tick loop ignores it.
    pub dead: bool,
    /// Components in insertion order, at most one per type.
    comps: Vec<Component>,
    /// Handle to the entity's inventory, possibly shared with a fused entity.
    pub inventory: Option<InventoryId>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, type_id: Option<EntityTypeId>, name: String, born: Tick) -> Self {
        Self {
            id,
            type_id,
            name,
            born,
            dead: false,
            comps: Vec::new(),
            inventory: None,
        }
    }

    /// Finds a component by type. Absence is a normal answer.
    #[must_use]
    pub fn get_component(&self, type_id: ComponentTypeId) -> Option<&Component> {
        self.comps.iter().find(|c| c.type_id == type_id)
    }

    /// Finds a component by type for mutation.
    pub fn get_component_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut Component> {
        self.comps.iter_mut().find(|c| c.type_id == type_id)
    }

    /// Checks whether the entity has a component of this type.
    #[inline]
    #[must_use]
    pub fn has_component(&self, type_id: ComponentTypeId) -> bool {
        self.get_component(type_id).is_some()
    }

    /// Returns the component of `def`'s type, creating a zeroed one first
    /// if the entity has none.
    pub fn assert_component(&mut self, def: &CompDef) -> &mut Component {
        let index = match self.comps.iter().position(|c| c.type_id == def.id) {
            Some(index) => index,
            None => {
                self.comps.push(Component {
                    type_id: def.id,
                    value: ComponentValue::zeroed(def),
                });
                self.comps.len() - 1
            }
        };
        &mut self.comps[index]
    }

    /// Iterates over the entity's components.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.comps.iter()
    }
}
