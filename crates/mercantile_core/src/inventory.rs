//! # Inventory & Escrow
//!
//! Per-entity stock keyed by item entity id, plus an escrow ledger of claims
//! on stock that has been offered for sale.
//!
//! A unit of stock is either in the general pool (`InvItem::count`) or
//! earmarked in escrow for one claimant, never both. Listing stock moves it
//! from the pool into the seller's own escrow bucket; a completed sale only
//! reassigns the claim to the buyer, the goods stay where they are.
//!
//! Inventories are stored in an [`InventoryPool`] and addressed by
//! [`InventoryId`], which lets two fused entities hold the same handle.

use serde::{Deserialize, Serialize};

use crate::ecs::EntityId;
use crate::error::{next_id, CoreResult};

/// Signed item count. Stored counts are clamped to be non-negative.
pub type Quantity = i64;

/// Stock of one item in the general pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvItem {
    /// The item entity.
    pub item: EntityId,
    /// Units held, never negative.
    pub count: Quantity,
}

/// A claim of `owner` on `count` units of `item` held in this inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowItem {
    /// The entity holding the claim.
    pub owner: EntityId,
    /// The item entity.
    pub item: EntityId,
    /// Units claimed, never negative.
    pub count: Quantity,
}

/// Item stock and escrow ledger of one entity (or of a fused pair).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<InvItem>,
    escrow: Vec<EscrowItem>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` units of `item` (negative to remove).
    ///
    /// A missing entry is created with `max(0, count)`; an existing entry is
    /// clamped at zero after the addition.
    ///
    /// # Returns
    ///
    /// The count now held in the general pool.
    pub fn add_item(&mut self, item: EntityId, count: Quantity) -> Quantity {
        if let Some(entry) = self.items.iter_mut().find(|i| i.item == item) {
            entry.count = entry.count.saturating_add(count).max(0);
            return entry.count;
        }

        let count = count.max(0);
        self.items.push(InvItem { item, count });
        count
    }

    /// Looks up the general-pool entry for an item.
    #[must_use]
    pub fn get_item(&self, item: EntityId) -> Option<&InvItem> {
        self.items.iter().find(|i| i.item == item)
    }

    /// Returns the general-pool count of an item, 0 when absent.
    #[must_use]
    pub fn count(&self, item: EntityId) -> Quantity {
        self.get_item(item).map_or(0, |i| i.count)
    }

    /// Looks up the escrow bucket of `owner` for `item`.
    #[must_use]
    pub fn get_escrow(&self, owner: EntityId, item: EntityId) -> Option<&EscrowItem> {
        self.escrow
            .iter()
            .find(|e| e.owner == owner && e.item == item)
    }

    /// Returns the units of `item` claimed by `owner`, 0 when absent.
    #[must_use]
    pub fn escrow_count(&self, owner: EntityId, item: EntityId) -> Quantity {
        self.get_escrow(owner, item).map_or(0, |e| e.count)
    }

    /// Returns the units of `item` held in escrow across all owners.
    #[must_use]
    pub fn total_escrowed(&self, item: EntityId) -> Quantity {
        self.escrow
            .iter()
            .filter(|e| e.item == item)
            .map(|e| e.count)
            .sum()
    }

    /// Adds `count` to the escrow bucket of `(owner, item)`, clamped at zero.
    ///
    /// This creates claims out of nothing and is meant for merging ledgers;
    /// trading goes through [`Inventory::move_to_escrow`].
    pub fn add_escrow(&mut self, owner: EntityId, item: EntityId, count: Quantity) -> Quantity {
        let entry = self.assert_escrow(owner, item);
        entry.count = entry.count.saturating_add(count).max(0);
        entry.count
    }

    /// Moves up to `count` units of `item` from the general pool into the
    /// escrow bucket of `new_owner`.
    ///
    /// # Returns
    ///
    /// The number of units actually moved, which is less than `count` when
    /// the pool runs short.
    pub fn move_to_escrow(&mut self, new_owner: EntityId, item: EntityId, count: Quantity) -> Quantity {
        if count <= 0 {
            return 0;
        }

        let Some(entry) = self.items.iter_mut().find(|i| i.item == item) else {
            return 0;
        };
        let to_move = count.min(entry.count);
        if to_move <= 0 {
            return 0;
        }
        entry.count -= to_move;

        let claim = self.assert_escrow(new_owner, item);
        claim.count += to_move;
        to_move
    }

    /// Reassigns up to `count` units of escrow claim on `item` from
    /// `old_owner` to `new_owner`.
    ///
    /// # Returns
    ///
    /// The number of units actually reassigned, clamped to the old owner's
    /// claim.
    pub fn escrow_change_owner(
        &mut self,
        old_owner: EntityId,
        new_owner: EntityId,
        item: EntityId,
        count: Quantity,
    ) -> Quantity {
        if count <= 0 {
            return 0;
        }

        let Some(old) = self
            .escrow
            .iter_mut()
            .find(|e| e.owner == old_owner && e.item == item)
        else {
            return 0;
        };
        let to_change = count.min(old.count);
        if to_change <= 0 {
            return 0;
        }
        old.count -= to_change;

        let new = self.assert_escrow(new_owner, item);
        new.count += to_change;
        to_change
    }

    /// Returns up to `count` units of `owner`'s escrow claim on `item` to
    /// the general pool.
    ///
    /// # Returns
    ///
    /// The number of units actually released, clamped to the claim.
    pub fn release_escrow(&mut self, owner: EntityId, item: EntityId, count: Quantity) -> Quantity {
        if count <= 0 {
            return 0;
        }

        let Some(claim) = self
            .escrow
            .iter_mut()
            .find(|e| e.owner == owner && e.item == item)
        else {
            return 0;
        };
        let to_release = count.min(claim.count);
        if to_release <= 0 {
            return 0;
        }
        claim.count -= to_release;

        self.add_item(item, to_release);
        to_release
    }

    /// Moves everything held by `other` into this inventory, pool and escrow.
    pub fn merge_from(&mut self, other: Inventory) {
        for it in other.items {
            self.add_item(it.item, it.count);
        }
        for claim in other.escrow {
            self.add_escrow(claim.owner, claim.item, claim.count);
        }
    }

    /// Iterates over the general-pool entries.
    pub fn items(&self) -> impl Iterator<Item = &InvItem> {
        self.items.iter()
    }

    /// Iterates over the escrow ledger.
    pub fn escrow(&self) -> impl Iterator<Item = &EscrowItem> {
        self.escrow.iter()
    }

    fn assert_escrow(&mut self, owner: EntityId, item: EntityId) -> &mut EscrowItem {
        let index = match self
            .escrow
            .iter()
            .position(|e| e.owner == owner && e.item == item)
        {
            Some(index) => index,
            None => {
                self.escrow.push(EscrowItem {
                    owner,
                    item,
                    count: 0,
                });
                self.escrow.len() - 1
            }
        };
        &mut self.escrow[index]
    }
}

/// Stable handle to an inventory held in an [`InventoryPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryId(u32);

impl InventoryId {
    /// Returns the slot index behind this handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot storage for inventories.
///
/// Handles stay valid until freed; freed slots are reused by later
/// allocations. Slots never move, so a handle recorded anywhere keeps
/// pointing at the same inventory while it lives.
#[derive(Clone, Debug, Default)]
pub struct InventoryPool {
    /// The storage slots.
    slots: Vec<Option<Inventory>>,
    /// Handles of freed slots.
    free_list: Vec<InventoryId>,
    /// Number of live inventories.
    allocated_count: usize,
}

impl InventoryPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live inventories.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Creates a pool holding one inventory and returns its handle.
    #[must_use]
    pub fn with_inventory(inventory: Inventory) -> (Self, InventoryId) {
        let pool = Self {
            slots: vec![Some(inventory)],
            free_list: Vec::new(),
            allocated_count: 1,
        };
        (pool, InventoryId(0))
    }

    /// Stores an inventory and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::IdSpaceExhausted` if no handle is left.
    pub fn allocate(&mut self, inventory: Inventory) -> CoreResult<InventoryId> {
        if let Some(id) = self.free_list.pop() {
            self.slots[id.index()] = Some(inventory);
            self.allocated_count += 1;
            return Ok(id);
        }

        let id = InventoryId(next_id(self.slots.len(), "inventory")?);
        self.slots.push(Some(inventory));
        self.allocated_count += 1;
        Ok(id)
    }

    /// Removes an inventory, returning it. `None` if the handle was stale.
    pub fn free(&mut self, id: InventoryId) -> Option<Inventory> {
        let inventory = self.slots.get_mut(id.index())?.take()?;
        self.free_list.push(id);
        self.allocated_count -= 1;
        Some(inventory)
    }

    /// Gets an inventory by handle.
    #[inline]
    #[must_use]
    pub fn get(&self, id: InventoryId) -> Option<&Inventory> {
        self.slots.get(id.index())?.as_ref()
    }

    /// Gets a mutable inventory by handle.
    #[inline]
    pub fn get_mut(&mut self, id: InventoryId) -> Option<&mut Inventory> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Iterates over every live inventory once.
    pub fn iter(&self) -> impl Iterator<Item = (InventoryId, &Inventory)> {
        self.slots
            .iter()
            .zip(0_u32..)
            .filter_map(|(slot, index)| slot.as_ref().map(|inv| (InventoryId(index), inv)))
    }
}
