//! # World
//!
//! The single owner of the data model: component schema, entity types,
//! the entity table and the inventory pool. Every operation goes through an
//! explicit `&World` / `&mut World`; there is no process-wide state.

use super::component::{Component, ComponentTypeId, ComponentValue, InternalType};
use super::entity::{Entity, EntityDef, EntityId, EntityTypeId, Tick};
use super::registry::ComponentRegistry;
use crate::error::{next_id, CoreError, CoreResult};
use crate::inventory::{Inventory, InventoryId, InventoryPool, Quantity};

/// Debug name of entity 0.
const NULL_ENTITY_NAME: &str = "Null Entity";
/// Entity type whose entities are tradeable items.
const ITEM_TYPE_NAME: &str = "Item";
/// String component holding an item's display name.
const ITEM_NAME_COMPONENT: &str = "name";

/// The world state: schema, entities and inventories.
///
/// Entities are appended and never removed, so an [`EntityId`] stays valid
/// for the life of the world and a loop over `0..entity_count()` captured
/// before a tick is unaffected by entities spawned during it.
///
/// # Example
///
/// ```rust
/// use mercantile_core::{InternalType, World};
///
/// let mut world = World::new();
/// let item = world.register_entity_def("Item", None).unwrap();
/// let farm = world.register_entity_def("Farm", None).unwrap();
///
/// let wheat = world.create_entity(item, "wheat").unwrap();
/// let field = world.create_entity(farm, "field").unwrap();
/// world.add_item(field, wheat, 12).unwrap();
///
/// assert_eq!(world.inventory_of(field).map(|inv| inv.count(wheat)), Some(12));
/// ```
#[derive(Clone, Debug)]
pub struct World {
    /// Current tick.
    tick: Tick,
    /// Component schema.
    components: ComponentRegistry,
    /// Entity archetypes.
    entity_defs: Vec<EntityDef>,
    /// Entity table, indexed by id.
    entities: Vec<Entity>,
    /// Inventories, shared by handle.
    inventories: InventoryPool,
}

impl World {
    /// Creates an empty world holding only the null entity (id 0).
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick: 0,
            components: ComponentRegistry::new(),
            entity_defs: Vec::new(),
            entities: vec![Entity::new(EntityId::NULL, None, NULL_ENTITY_NAME.to_string(), 0)],
            inventories: InventoryPool::new(),
        }
    }

    /// Creates a world holding the null entity and one untyped holder
    /// (id 1) that owns an empty inventory. Returns the holder's id.
    #[must_use]
    pub fn with_holder(name: &str) -> (Self, EntityId) {
        let holder = EntityId::new(1);
        let (inventories, handle) = InventoryPool::with_inventory(Inventory::new());
        let mut entity = Entity::new(holder, None, name.to_string(), 0);
        entity.inventory = Some(handle);

        let mut world = Self::new();
        world.entities.push(entity);
        world.inventories = inventories;
        (world, holder)
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Returns the current tick.
    #[inline]
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Advances the clock by one tick and returns the new tick.
    pub fn advance_tick(&mut self) -> Tick {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Returns the component schema.
    #[inline]
    #[must_use]
    pub const fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateComponentType` if the name is taken.
    pub fn register_component_type(
        &mut self,
        name: &str,
        internal: InternalType,
        is_array: bool,
    ) -> CoreResult<ComponentTypeId> {
        self.components.register(name, internal, is_array)
    }

    /// Finds a component type by name. A miss is a normal answer.
    #[must_use]
    pub fn resolve_component_type(&self, name: &str) -> Option<ComponentTypeId> {
        self.components.resolve(name)
    }

    /// Registers an entity type.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateEntityType` if the name is taken,
    /// `CoreError::IdSpaceExhausted` once every type id is in use, or
    /// `CoreError::UnknownComponentType` if the fused-inventory component is
    /// not registered.
    pub fn register_entity_def(
        &mut self,
        name: &str,
        fused_inventory: Option<ComponentTypeId>,
    ) -> CoreResult<EntityTypeId> {
        if self.entity_type_by_name(name).is_some() {
            return Err(CoreError::DuplicateEntityType(name.to_string()));
        }
        if let Some(comp) = fused_inventory {
            if self.components.get(comp).is_none() {
                return Err(CoreError::UnknownComponentType(comp));
            }
        }

        let id = EntityTypeId::new(next_id(self.entity_defs.len(), "entity type")?);
        self.entity_defs.push(EntityDef {
            id,
            name: name.to_string(),
            fused_inventory,
        });
        Ok(id)
    }

    /// Finds an entity type by name.
    #[must_use]
    pub fn entity_type_by_name(&self, name: &str) -> Option<EntityTypeId> {
        self.entity_defs
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.id)
    }

    /// Gets an entity type by id.
    #[must_use]
    pub fn entity_def(&self, id: EntityTypeId) -> Option<&EntityDef> {
        self.entity_defs.get(id.index())
    }

    /// Iterates over all entity types.
    pub fn entity_defs(&self) -> impl Iterator<Item = &EntityDef> {
        self.entity_defs.iter()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity of a registered type.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntityTypeId` if the type is not registered,
    /// or `CoreError::IdSpaceExhausted` once every entity id is in use.
    pub fn create_entity(&mut self, type_id: EntityTypeId, name: &str) -> CoreResult<EntityId> {
        if self.entity_def(type_id).is_none() {
            return Err(CoreError::UnknownEntityTypeId(type_id));
        }
        self.push_entity(Some(type_id), name)
    }

    /// Creates an entity of the type registered under `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntityType` if no such type exists, or
    /// `CoreError::IdSpaceExhausted` once every entity id is in use.
    pub fn create_entity_by_type_name(&mut self, type_name: &str, name: &str) -> CoreResult<EntityId> {
        let type_id = self
            .entity_type_by_name(type_name)
            .ok_or_else(|| CoreError::UnknownEntityType(type_name.to_string()))?;
        self.push_entity(Some(type_id), name)
    }

    /// Creates a built-in entity that has no archetype.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::IdSpaceExhausted` once every entity id is in use.
    pub fn create_untyped_entity(&mut self, name: &str) -> CoreResult<EntityId> {
        self.push_entity(None, name)
    }

    fn push_entity(&mut self, type_id: Option<EntityTypeId>, name: &str) -> CoreResult<EntityId> {
        let id = EntityId::new(next_id(self.entities.len(), "entity")?);
        self.entities
            .push(Entity::new(id, type_id, name.to_string(), self.tick));
        Ok(id)
    }

    /// Returns the number of entities, the null entity included.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Gets an entity by id.
    #[inline]
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    /// Gets an entity by id for mutation.
    #[inline]
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// Iterates over every entity in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterates over the entities of one type.
    pub fn entities_of_type(&self, type_id: EntityTypeId) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(move |e| e.type_id == Some(type_id))
    }

    /// Iterates over the entities of the type named `type_name`; yields
    /// nothing if the type is unknown.
    pub fn entities_of_type_name<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a Entity> {
        let type_id = self.entity_type_by_name(type_name);
        self.entities
            .iter()
            .filter(move |e| type_id.is_some() && e.type_id == type_id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Finds a component on an entity. `None` when either is missing.
    #[must_use]
    pub fn get_component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<&Component> {
        self.entity(entity)?.get_component(type_id)
    }

    /// Finds a component on an entity for mutation.
    pub fn get_component_mut(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
    ) -> Option<&mut Component> {
        self.entity_mut(entity)?.get_component_mut(type_id)
    }

    /// Finds a component on an entity by component name.
    #[must_use]
    pub fn component_by_name(&self, entity: EntityId, name: &str) -> Option<&Component> {
        let type_id = self.resolve_component_type(name)?;
        self.get_component(entity, type_id)
    }

    /// Gets or creates a component; a new component starts zeroed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntity` or
    /// `CoreError::UnknownComponentType` for dangling ids.
    pub fn assert_component(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
    ) -> CoreResult<&mut Component> {
        let def = self
            .components
            .get(type_id)
            .ok_or(CoreError::UnknownComponentType(type_id))?;
        let target = self
            .entities
            .get_mut(entity.index())
            .ok_or(CoreError::UnknownEntity(entity))?;
        Ok(target.assert_component(def))
    }

    /// Assigns a value to a component, creating the component if needed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ComponentTypeMismatch` if the value does not
    /// match the component's declared storage. That is a schema bug, not a
    /// runtime condition, and nothing is written.
    pub fn set_component(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
        value: ComponentValue,
    ) -> CoreResult<&mut Component> {
        let def = self
            .components
            .get(type_id)
            .ok_or(CoreError::UnknownComponentType(type_id))?;
        if !value.fits(def) {
            return Err(CoreError::ComponentTypeMismatch {
                component: def.name.clone(),
                expected: def.shape(),
                found: value.shape(),
            });
        }

        let target = self
            .entities
            .get_mut(entity.index())
            .ok_or(CoreError::UnknownEntity(entity))?;
        let component = target.assert_component(def);
        component.value = value;
        Ok(component)
    }

    // =========================================================================
    // Inventories
    // =========================================================================

    /// Returns the inventory pool.
    #[inline]
    #[must_use]
    pub const fn inventories(&self) -> &InventoryPool {
        &self.inventories
    }

    /// Returns the handle of an entity's inventory.
    #[must_use]
    pub fn inventory_id_of(&self, entity: EntityId) -> Option<InventoryId> {
        self.entity(entity)?.inventory
    }

    /// Returns an entity's inventory.
    #[must_use]
    pub fn inventory_of(&self, entity: EntityId) -> Option<&Inventory> {
        let id = self.inventory_id_of(entity)?;
        self.inventories.get(id)
    }

    /// Returns an entity's inventory for mutation.
    pub fn inventory_of_mut(&mut self, entity: EntityId) -> Option<&mut Inventory> {
        let id = self.inventory_id_of(entity)?;
        self.inventories.get_mut(id)
    }

    /// Returns an entity's inventory, creating an empty one if it has none.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntity` if the entity does not exist, or
    /// `CoreError::IdSpaceExhausted` if the pool has no handle left.
    pub fn ensure_inventory(&mut self, entity: EntityId) -> CoreResult<&mut Inventory> {
        let handle = self.ensure_inventory_id(entity)?;
        self.inventories
            .get_mut(handle)
            .ok_or(CoreError::UnknownEntity(entity))
    }

    fn ensure_inventory_id(&mut self, entity: EntityId) -> CoreResult<InventoryId> {
        let target = self
            .entities
            .get_mut(entity.index())
            .ok_or(CoreError::UnknownEntity(entity))?;
        if let Some(handle) = target.inventory {
            return Ok(handle);
        }
        let handle = self.inventories.allocate(Inventory::new())?;
        target.inventory = Some(handle);
        Ok(handle)
    }

    /// Adds items to an entity's inventory, creating the inventory on demand.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntity` if the entity does not exist.
    pub fn add_item(&mut self, entity: EntityId, item: EntityId, count: Quantity) -> CoreResult<Quantity> {
        Ok(self.ensure_inventory(entity)?.add_item(item, count))
    }

    /// Makes `extra` share the inventory of `core`.
    ///
    /// If both already hold inventories, `extra`'s stock and escrow are
    /// merged into `core`'s and `extra`'s slot is released. Afterwards both
    /// entities refer to the same handle.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownEntity` if either entity does not exist, or
    /// `CoreError::IdSpaceExhausted` if neither has an inventory and the
    /// pool has no handle left.
    pub fn fuse_inventories(&mut self, core: EntityId, extra: EntityId) -> CoreResult<InventoryId> {
        let core_inv = self.entity(core).ok_or(CoreError::UnknownEntity(core))?.inventory;
        let extra_inv = self.entity(extra).ok_or(CoreError::UnknownEntity(extra))?.inventory;

        let shared = match (core_inv, extra_inv) {
            (None, None) => self.inventories.allocate(Inventory::new())?,
            (None, Some(extra_inv)) => extra_inv,
            (Some(core_inv), None) => core_inv,
            (Some(core_inv), Some(extra_inv)) if core_inv == extra_inv => core_inv,
            (Some(core_inv), Some(extra_inv)) => {
                if let Some(absorbed) = self.inventories.free(extra_inv) {
                    if let Some(target) = self.inventories.get_mut(core_inv) {
                        target.merge_from(absorbed);
                    }
                }
                // Any third entity still holding the freed handle follows along.
                for entity in &mut self.entities {
                    if entity.inventory == Some(extra_inv) {
                        entity.inventory = Some(core_inv);
                    }
                }
                core_inv
            }
        };

        for id in [core, extra] {
            if let Some(entity) = self.entities.get_mut(id.index()) {
                entity.inventory = Some(shared);
            }
        }
        tracing::debug!(core = %core, extra = %extra, inventory = shared.index(), "fused inventories");
        Ok(shared)
    }

    // =========================================================================
    // Item lookups for presentation layers
    // =========================================================================

    /// Finds the item entity whose `name` component equals `name`.
    #[must_use]
    pub fn find_item(&self, name: &str) -> Option<EntityId> {
        let name_comp = self.resolve_component_type(ITEM_NAME_COMPONENT)?;
        self.entities_of_type_name(ITEM_TYPE_NAME)
            .find(|e| {
                e.get_component(name_comp)
                    .and_then(Component::as_str)
                    .is_some_and(|n| n == name)
            })
            .map(|e| e.id)
    }

    /// Returns the general-pool count of the named item held by `entity`.
    #[must_use]
    pub fn item_count_by_name(&self, entity: EntityId, item_name: &str) -> Quantity {
        let Some(item) = self.find_item(item_name) else {
            return 0;
        };
        self.inventory_of(entity).map_or(0, |inv| inv.count(item))
    }

    /// Returns the units of the named item held in `entity`'s inventory on
    /// behalf of `owner`.
    #[must_use]
    pub fn escrow_count_by_name(&self, entity: EntityId, owner: EntityId, item_name: &str) -> Quantity {
        let Some(item) = self.find_item(item_name) else {
            return 0;
        };
        self.inventory_of(entity)
            .map_or(0, |inv| inv.escrow_count(owner, item))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
