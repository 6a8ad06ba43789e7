//! # Component Type Registry
//!
//! The schema of the world: every component type that configuration
//! declared, looked up by id on the hot path and by name at startup.

use super::component::{
    CompDef, ComponentTypeId, ConversionRate, InternalType, ItemPrice, ItemRate, RoadConnect,
    RoadSpan,
};
use super::entity::EntityId;
use crate::error::{next_id, CoreError, CoreResult};

/// Returns the payload size of one value of `internal`.
#[must_use]
pub const fn size_of_internal_type(internal: InternalType) -> usize {
    match internal {
        InternalType::Int => std::mem::size_of::<i64>(),
        InternalType::Float => std::mem::size_of::<f64>(),
        InternalType::Id => std::mem::size_of::<EntityId>(),
        InternalType::Str => std::mem::size_of::<String>(),
        InternalType::ItemRate => std::mem::size_of::<ItemRate>(),
        InternalType::ItemPrice => std::mem::size_of::<ItemPrice>(),
        InternalType::ConversionRate => std::mem::size_of::<ConversionRate>(),
        InternalType::RoadSpan => std::mem::size_of::<RoadSpan>(),
        InternalType::RoadConnect => std::mem::size_of::<RoadConnect>(),
    }
}

/// All registered component types, indexed by [`ComponentTypeId`].
#[derive(Clone, Debug, Default)]
pub struct ComponentRegistry {
    defs: Vec<CompDef>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DuplicateComponentType` if the name is taken, or
    /// `CoreError::IdSpaceExhausted` once every id is in use.
    pub fn register(
        &mut self,
        name: &str,
        internal: InternalType,
        is_array: bool,
    ) -> CoreResult<ComponentTypeId> {
        if self.resolve(name).is_some() {
            return Err(CoreError::DuplicateComponentType(name.to_string()));
        }

        let id = ComponentTypeId::new(next_id(self.defs.len(), "component type")?);
        self.defs
            .push(CompDef::new(id, name.to_string(), internal, is_array));
        Ok(id)
    }

    /// Finds a component type by name.
    ///
    /// A miss is routine (optional components), so it is not an error.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ComponentTypeId> {
        self.defs.iter().find(|d| d.name == name).map(|d| d.id)
    }

    /// Gets a component declaration by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ComponentTypeId) -> Option<&CompDef> {
        self.defs.get(id.index())
    }

    /// Returns the number of registered types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Iterates over all declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CompDef> {
        self.defs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        let produces = registry.register("produces", InternalType::ItemRate, false).unwrap();
        let tags = registry.register("tags", InternalType::Str, true).unwrap();

        assert_eq!(registry.resolve("produces"), Some(produces));
        assert_eq!(registry.resolve("tags"), Some(tags));
        assert_eq!(registry.resolve("sells"), None);

        let def = registry.get(tags).unwrap();
        assert!(def.is_array);
        assert!(!def.is_heap_allocated);
        assert!(registry.get(produces).unwrap().is_heap_allocated);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register("name", InternalType::Str, false).unwrap();
        let err = registry.register("name", InternalType::Int, false);
        assert_eq!(err, Err(CoreError::DuplicateComponentType("name".into())));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(size_of_internal_type(InternalType::Int), 8);
        assert_eq!(size_of_internal_type(InternalType::Id), 4);
        assert_eq!(size_of_internal_type(InternalType::ItemPrice), 16);
        assert!(size_of_internal_type(InternalType::ItemRate) >= 20);
    }
}
