//! # Commodity Sets
//!
//! A fixed-capacity, always-sorted array of `(commodity, quantity)` buckets.
//! Binary search drives both the insertion point and lookup, so `get` is
//! O(log n) and the buckets can be walked in commodity order for reports.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Small integer identifying a commodity (an item entity's raw id).
pub type CommodityId = u32;

/// One bucket of a [`CommoditySet`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityBucket {
    /// The commodity this bucket counts.
    pub commodity: CommodityId,
    /// Accumulated quantity.
    pub qty: i64,
}

/// Sorted buckets with a capacity fixed at creation.
///
/// # Example
///
/// ```rust
/// use mercantile_core::CommoditySet;
///
/// let mut set = CommoditySet::with_capacity(4);
/// set.add(7, 3, false).unwrap();
/// set.add(2, 5, false).unwrap();
/// set.add(7, 1, false).unwrap();
///
/// assert_eq!(set.get(7), 4);
/// assert_eq!(set.get(9), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommoditySet {
    buckets: Vec<CommodityBucket>,
    capacity: usize,
}

impl CommoditySet {
    /// Creates an empty set able to hold `capacity` distinct commodities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the fixed bucket capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of buckets in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true when no bucket is in use.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns true when no new commodity can be added.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buckets.len() >= self.capacity
    }

    /// Adds `qty` to a commodity, inserting a bucket at its sorted position
    /// when the commodity is new.
    ///
    /// With `compact` set, a bucket whose quantity drops to zero is removed.
    ///
    /// # Returns
    ///
    /// The quantity now held for the commodity.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::CommoditySetFull` if the commodity is new and
    /// every bucket is taken. The set is left unchanged.
    pub fn add(&mut self, commodity: CommodityId, qty: i64, compact: bool) -> CoreResult<i64> {
        match self.buckets.binary_search_by_key(&commodity, |b| b.commodity) {
            Ok(index) => {
                let bucket = &mut self.buckets[index];
                bucket.qty = bucket.qty.saturating_add(qty);
                let total = bucket.qty;
                if compact && total == 0 {
                    self.buckets.remove(index);
                }
                Ok(total)
            }
            Err(index) => {
                if compact && qty == 0 {
                    return Ok(0);
                }
                if self.is_full() {
                    return Err(CoreError::CommoditySetFull {
                        capacity: self.capacity,
                    });
                }
                self.buckets.insert(index, CommodityBucket { commodity, qty });
                Ok(qty)
            }
        }
    }

    /// Returns the quantity held for a commodity, or 0 if it was never added.
    #[must_use]
    pub fn get(&self, commodity: CommodityId) -> i64 {
        self.buckets
            .binary_search_by_key(&commodity, |b| b.commodity)
            .map_or(0, |index| self.buckets[index].qty)
    }

    /// Returns the buckets in commodity order.
    #[inline]
    #[must_use]
    pub fn buckets(&self) -> &[CommodityBucket] {
        &self.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(set: &CommoditySet) -> bool {
        set.buckets()
            .windows(2)
            .all(|w| w[0].commodity < w[1].commodity)
    }

    #[test]
    fn test_add_keeps_buckets_sorted() {
        let mut set = CommoditySet::with_capacity(16);
        for (commodity, qty) in [(9, 1), (3, 2), (12, 3), (1, 4), (3, 5), (7, 6), (12, -1)] {
            set.add(commodity, qty, false).unwrap();
            assert!(is_sorted(&set));
        }

        assert_eq!(set.get(1), 4);
        assert_eq!(set.get(3), 7);
        assert_eq!(set.get(7), 6);
        assert_eq!(set.get(9), 1);
        assert_eq!(set.get(12), 2);
        assert_eq!(set.get(4), 0);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_full_set_rejects_new_commodity() {
        let mut set = CommoditySet::with_capacity(2);
        set.add(1, 1, false).unwrap();
        set.add(2, 1, false).unwrap();

        let result = set.add(3, 1, false);
        assert_eq!(result, Err(CoreError::CommoditySetFull { capacity: 2 }));
        assert_eq!(set.len(), 2);

        // Existing commodities still accumulate.
        assert_eq!(set.add(2, 4, false), Ok(5));
    }

    #[test]
    fn test_compact_removes_empty_bucket() {
        let mut set = CommoditySet::with_capacity(2);
        set.add(5, 3, true).unwrap();
        set.add(5, -3, true).unwrap();
        assert!(set.is_empty());

        set.add(5, 3, false).unwrap();
        set.add(5, -3, false).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(5), 0);
    }
}
