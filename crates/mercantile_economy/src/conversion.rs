//! # Conversion Engine
//!
//! A conversion turns a fixed ratio of input items into output items, in
//! whole batches only.
//!
//! The engine is split in two on purpose:
//!
//! 1. [`Conversion::max_applicable`] answers how many batches the inventory
//!    can pay for, short-circuiting to 0 when any input is short.
//! 2. [`Conversion::apply`] performs that many batches without checking
//!    again. Callers run the check first; the tick loop always does.
//!
//! A conversion that cannot satisfy every input produces nothing.

use serde::{Deserialize, Serialize};

use mercantile_core::{next_id, ConversionId, EntityId, Inventory, Quantity};

use crate::error::{EconomyError, EconomyResult};

/// One input or output line of a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionLine {
    /// Item entity consumed or produced.
    pub item: EntityId,
    /// Units per batch, always positive.
    pub count: Quantity,
}

impl ConversionLine {
    /// Creates a recipe line.
    #[inline]
    #[must_use]
    pub const fn new(item: EntityId, count: Quantity) -> Self {
        Self { item, count }
    }
}

/// A recipe: inputs consumed and outputs produced per batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Index in the conversion table.
    pub id: ConversionId,
    /// Human-readable name.
    pub name: String,
    /// Items consumed per batch.
    pub inputs: Vec<ConversionLine>,
    /// Items produced per batch.
    pub outputs: Vec<ConversionLine>,
}

impl Conversion {
    /// Returns how many whole batches `inventory` can pay for.
    ///
    /// Only the general pool counts; stock in escrow is spoken for.
    #[must_use]
    pub fn max_applicable(&self, inventory: &Inventory) -> Quantity {
        let mut batches = Quantity::MAX;
        for input in &self.inputs {
            if input.count <= 0 {
                return 0;
            }
            let affordable = inventory.count(input.item) / input.count;
            if affordable == 0 {
                return 0;
            }
            batches = batches.min(affordable);
        }

        if self.inputs.is_empty() {
            0
        } else {
            batches
        }
    }

    /// Applies `batches` batches to `inventory` without re-checking inputs.
    ///
    /// Input counts clamp at zero if called with more batches than
    /// [`Conversion::max_applicable`] allowed. Zero or negative batches are
    /// a no-op.
    pub fn apply(&self, inventory: &mut Inventory, batches: Quantity) {
        if batches <= 0 {
            return;
        }

        for input in &self.inputs {
            inventory.add_item(input.item, input.count.saturating_mul(batches).saturating_neg());
        }
        for output in &self.outputs {
            inventory.add_item(output.item, output.count.saturating_mul(batches));
        }
    }
}

/// All conversions, indexed by [`ConversionId`].
#[derive(Clone, Debug, Default)]
pub struct ConversionTable {
    conversions: Vec<Conversion>,
}

impl ConversionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a conversion.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::InvalidConversion` if the recipe has no inputs,
    /// no outputs, or a non-positive line count, and `EconomyError::Core`
    /// once every conversion id is in use.
    pub fn add(
        &mut self,
        name: &str,
        inputs: Vec<ConversionLine>,
        outputs: Vec<ConversionLine>,
    ) -> EconomyResult<ConversionId> {
        if inputs.is_empty() {
            return Err(EconomyError::invalid_conversion(name, "no inputs"));
        }
        if outputs.is_empty() {
            return Err(EconomyError::invalid_conversion(name, "no outputs"));
        }
        if let Some(line) = inputs.iter().chain(&outputs).find(|l| l.count <= 0) {
            return Err(EconomyError::invalid_conversion(
                name,
                format!("line count {} must be positive", line.count),
            ));
        }

        let id = ConversionId::new(next_id(self.conversions.len(), "conversion")?);
        self.conversions.push(Conversion {
            id,
            name: name.to_string(),
            inputs,
            outputs,
        });
        Ok(id)
    }

    /// Gets a conversion by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ConversionId) -> Option<&Conversion> {
        self.conversions.get(id.index())
    }

    /// Gets a conversion by id for mutation.
    #[inline]
    pub fn get_mut(&mut self, id: ConversionId) -> Option<&mut Conversion> {
        self.conversions.get_mut(id.index())
    }

    /// Finds a conversion by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Conversion> {
        self.conversions.iter().find(|c| c.name == name)
    }

    /// Returns the number of conversions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    /// Returns true if the table is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }

    /// Iterates over all conversions.
    pub fn iter(&self) -> impl Iterator<Item = &Conversion> {
        self.conversions.iter()
    }
}
