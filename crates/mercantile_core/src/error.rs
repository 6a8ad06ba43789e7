//! # Core Error Types
//!
//! Errors raised by the data model. Most of them mean the configuration and
//! the code disagree about the schema; runtime arithmetic never errors.

use thiserror::Error;

use crate::ecs::{ComponentTypeId, EntityId, EntityTypeId};

/// Errors that can occur in the core data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An entity id does not refer to a live entity.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// No entity type is registered under this name.
    #[error("unknown entity type: '{0}'")]
    UnknownEntityType(String),

    /// No entity type is registered under this id.
    #[error("unknown entity type id: {0}")]
    UnknownEntityTypeId(EntityTypeId),

    /// No component type is registered under this id.
    #[error("unknown component type id: {0}")]
    UnknownComponentType(ComponentTypeId),

    /// A component type name was registered twice.
    #[error("component type '{0}' already registered")]
    DuplicateComponentType(String),

    /// An entity type name was registered twice.
    #[error("entity type '{0}' already registered")]
    DuplicateEntityType(String),

    /// A value was assigned to a component whose declared storage differs.
    #[error("component '{component}' stores {expected}, got {found}")]
    ComponentTypeMismatch {
        /// Name of the component type.
        component: String,
        /// Declared storage shape.
        expected: String,
        /// Shape of the offered value.
        found: String,
    },

    /// A table has handed out every id a `u32` can hold.
    #[error("{table} table exhausted its id space")]
    IdSpaceExhausted {
        /// Name of the exhausted table.
        table: &'static str,
    },

    /// A commodity set has no free bucket for a new commodity.
    #[error("commodity set full: capacity {capacity}")]
    CommoditySetFull {
        /// Fixed bucket capacity of the set.
        capacity: usize,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Returns the id for the next row of a table holding `len` rows.
///
/// # Errors
///
/// Returns `CoreError::IdSpaceExhausted` if `len` does not fit in a `u32`.
#[inline]
pub fn next_id(len: usize, table: &'static str) -> CoreResult<u32> {
    u32::try_from(len).map_err(|_| CoreError::IdSpaceExhausted { table })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_checks_the_u32_range() {
        assert_eq!(next_id(0, "entities"), Ok(0));
        assert_eq!(next_id(u32::MAX as usize, "entities"), Ok(u32::MAX));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            next_id(u32::MAX as usize + 1, "entities"),
            Err(CoreError::IdSpaceExhausted { table: "entities" })
        );
    }
}
