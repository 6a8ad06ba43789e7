//! # Market
//!
//! A sell-order book plus standing buyers ("sinks").
//!
//! ## Escrow-backed orders
//!
//! Posting an order moves the seller's stock into escrow under the seller's
//! own name. The order only ever advertises what was actually escrowed. A
//! sale does not move goods between inventories: the escrow claim changes
//! owner from seller to buyer inside the seller's inventory.
//!
//! ## Matching
//!
//! Orders are matched greedily in list order, not by price. Exhausted orders
//! are removed with swap-remove, so the order of the remaining book is not
//! stable across sales. An order left holding less than its minimum fill is
//! withdrawn and the remainder goes back to the seller's pool.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use mercantile_core::{next_id, EntityId, Money, Quantity, World};

use crate::error::EconomyResult;

/// A standing offer to sell escrowed stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Entity whose inventory holds the escrowed stock.
    pub seller: EntityId,
    /// Item entity offered.
    pub item: EntityId,
    /// Units still escrowed for this order.
    pub qty_available: Quantity,
    /// Smallest fill the seller accepts.
    pub min_qty: Quantity,
    /// Unit price, at least 1.
    pub price: Money,
}

/// Identifier of a market sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SinkId(u32);

impl SinkId {
    /// Creates a sink id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the index into the sink list.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

/// A persistent buyer with unlimited money, capped by price and volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSink {
    /// Index in the sink list.
    pub id: SinkId,
    /// Display name.
    pub name: String,
    /// Item entity bought.
    pub item: EntityId,
    /// Highest unit price the sink pays.
    pub max_buy_price: Money,
    /// Units bought per tick; negative means unlimited.
    pub max_buys_per_tick: Quantity,
}

impl MarketSink {
    /// Whether the sink has no per-tick volume cap.
    #[inline]
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.max_buys_per_tick < 0
    }
}

/// Outcome of a purchase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Units bought.
    pub quantity: Quantity,
    /// Money spent.
    pub spent: Money,
}

impl AddAssign for Fill {
    fn add_assign(&mut self, rhs: Self) {
        self.quantity = self.quantity.saturating_add(rhs.quantity);
        self.spent = self.spent.saturating_add(rhs.spent);
    }
}

/// The order book and its sinks.
#[derive(Clone, Debug)]
pub struct Market {
    /// Standing sell orders, in arrival order until a removal swaps one.
    sells: Vec<MarketOrder>,
    /// Sinks, indexed by [`SinkId`].
    sinks: Vec<MarketSink>,
    /// Entity that every sink buys on behalf of.
    sink_entity: EntityId,
}

impl Market {
    /// Creates an empty market whose sinks buy as `sink_entity`.
    #[must_use]
    pub fn new(sink_entity: EntityId) -> Self {
        Self {
            sells: Vec::new(),
            sinks: Vec::new(),
            sink_entity,
        }
    }

    /// Returns the entity sinks buy on behalf of.
    #[inline]
    #[must_use]
    pub const fn sink_entity(&self) -> EntityId {
        self.sink_entity
    }

    /// Returns the standing sell orders.
    #[inline]
    #[must_use]
    pub fn orders(&self) -> &[MarketOrder] {
        &self.sells
    }

    /// Returns the sinks.
    #[inline]
    #[must_use]
    pub fn sinks(&self) -> &[MarketSink] {
        &self.sinks
    }

    /// Offers up to `qty` units of `item` from `seller`'s inventory.
    ///
    /// The price is floored at 1. Only stock that could actually be escrowed
    /// is offered, and nothing is posted if that is zero.
    ///
    /// # Returns
    ///
    /// Units escrowed for the new order.
    pub fn add_sell_order(
        &mut self,
        world: &mut World,
        seller: EntityId,
        item: EntityId,
        qty: Quantity,
        price: Money,
    ) -> Quantity {
        self.add_sell_order_with_min(world, seller, item, qty, 0, price)
    }

    /// Like [`Market::add_sell_order`], refusing fills below `min_qty` units.
    pub fn add_sell_order_with_min(
        &mut self,
        world: &mut World,
        seller: EntityId,
        item: EntityId,
        qty: Quantity,
        min_qty: Quantity,
        price: Money,
    ) -> Quantity {
        let price = price.max(1);

        let Some(inventory) = world.inventory_of_mut(seller) else {
            return 0;
        };
        let moved = inventory.move_to_escrow(seller, item, qty);
        if moved <= 0 {
            return 0;
        }

        // A minimum above the stock on offer would make the order unfillable.
        self.sells.push(MarketOrder {
            seller,
            item,
            qty_available: moved,
            min_qty: min_qty.clamp(0, moved),
            price,
        });
        moved
    }

    /// Buys up to `max_qty` units of `item` for at most `budget` in total.
    ///
    /// Orders are visited in list order and each is drained as far as the
    /// remaining quantity and budget allow. The buyer's claim is recorded in
    /// the seller's escrow ledger.
    ///
    /// # Returns
    ///
    /// What was actually bought and spent; both are at most the caps given.
    pub fn buy_now(
        &mut self,
        world: &mut World,
        buyer: EntityId,
        item: EntityId,
        max_qty: Quantity,
        budget: Money,
    ) -> Fill {
        self.match_orders(world, buyer, item, max_qty, budget, None)
    }

    fn match_orders(
        &mut self,
        world: &mut World,
        buyer: EntityId,
        item: EntityId,
        max_qty: Quantity,
        budget: Money,
        price_limit: Option<Money>,
    ) -> Fill {
        let mut fill = Fill::default();
        let mut remaining_qty = max_qty;
        let mut remaining_budget = budget;

        let mut i = 0;
        while remaining_qty > 0 && remaining_budget > 0 && i < self.sells.len() {
            let order = self.sells[i];
            if order.item != item || price_limit.is_some_and(|cap| order.price > cap) {
                i += 1;
                continue;
            }

            let max_spend = order
                .qty_available
                .saturating_mul(order.price)
                .min(remaining_budget);
            let to_buy = (max_spend / order.price).min(remaining_qty);
            if to_buy <= 0 || to_buy < order.min_qty {
                i += 1;
                continue;
            }

            let changed = world.inventory_of_mut(order.seller).map_or(0, |inv| {
                inv.escrow_change_owner(order.seller, buyer, item, to_buy)
            });
            let cost = changed.saturating_mul(order.price);

            remaining_qty -= changed;
            remaining_budget -= cost;
            fill += Fill {
                quantity: changed,
                spent: cost,
            };

            let slot = &mut self.sells[i];
            slot.qty_available -= changed;
            // A short transfer means the escrow backing the order is gone.
            if slot.qty_available <= 0 || changed < to_buy {
                self.sells.swap_remove(i);
            } else if slot.qty_available < slot.min_qty {
                // The rest can never be bought; hand it back to the seller.
                let stranded = self.sells.swap_remove(i);
                if let Some(inv) = world.inventory_of_mut(stranded.seller) {
                    inv.release_escrow(stranded.seller, item, stranded.qty_available);
                }
            } else {
                i += 1;
            }
        }

        fill
    }

    /// Adds a sink for `item` with no volume cap.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Core` once every sink id is in use.
    pub fn add_sink(&mut self, item: EntityId, max_buy_price: Money) -> EconomyResult<SinkId> {
        let id = SinkId::new(next_id(self.sinks.len(), "sink")?);
        self.sinks.push(MarketSink {
            id,
            name: String::new(),
            item,
            max_buy_price,
            max_buys_per_tick: -1,
        });
        Ok(id)
    }

    /// Gets a sink for mutation.
    pub fn sink_mut(&mut self, id: SinkId) -> Option<&mut MarketSink> {
        self.sinks.get_mut(id.index())
    }

    /// Lets every sink buy once.
    ///
    /// A capped sink buys at most `max_buys_per_tick` units with a budget of
    /// `max_buys_per_tick * max_buy_price`; an unlimited sink has neither
    /// cap. No sink ever pays more than its `max_buy_price` per unit.
    pub fn run_sinks(&mut self, world: &mut World) -> Fill {
        let mut total = Fill::default();

        for index in 0..self.sinks.len() {
            let sink = &self.sinks[index];
            let (item, price_cap) = (sink.item, sink.max_buy_price);
            let (max_qty, budget) = if sink.is_unlimited() {
                (Quantity::MAX, Money::MAX)
            } else {
                (
                    sink.max_buys_per_tick,
                    sink.max_buys_per_tick.saturating_mul(sink.max_buy_price),
                )
            };
            if max_qty == 0 {
                continue;
            }

            total += self.match_orders(world, self.sink_entity, item, max_qty, budget, Some(price_cap));
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Setup {
        world: World,
        market: Market,
        widget: EntityId,
        first: EntityId,
        second: EntityId,
        buyer: EntityId,
    }

    fn setup() -> Setup {
        let (mut world, sink_entity) = World::with_holder("Market Sink");
        let item = world.register_entity_def("Item", None).unwrap();
        let trader = world.register_entity_def("Trader", None).unwrap();

        let widget = world.create_entity(item, "widget").unwrap();
        let first = world.create_entity(trader, "first").unwrap();
        let second = world.create_entity(trader, "second").unwrap();
        let buyer = world.create_entity(trader, "buyer").unwrap();
        world.add_item(first, widget, 3).unwrap();
        world.add_item(second, widget, 10).unwrap();

        Setup {
            world,
            market: Market::new(sink_entity),
            widget,
            first,
            second,
            buyer,
        }
    }

    #[test]
    fn test_greedy_matching_in_insertion_order() {
        let mut s = setup();
        s.market.add_sell_order(&mut s.world, s.first, s.widget, 3, 5);
        s.market.add_sell_order(&mut s.world, s.second, s.widget, 10, 3);

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 10, 20);
        assert_eq!(fill, Fill { quantity: 4, spent: 18 });

        let first_inv = s.world.inventory_of(s.first).unwrap();
        assert_eq!(first_inv.escrow_count(s.buyer, s.widget), 3);
        assert_eq!(first_inv.escrow_count(s.first, s.widget), 0);
        let second_inv = s.world.inventory_of(s.second).unwrap();
        assert_eq!(second_inv.escrow_count(s.buyer, s.widget), 1);
        assert_eq!(second_inv.escrow_count(s.second, s.widget), 9);

        // The drained first order was swap-removed.
        assert_eq!(s.market.orders().len(), 1);
        assert_eq!(s.market.orders()[0].seller, s.second);
        assert_eq!(s.market.orders()[0].qty_available, 9);
    }

    #[test]
    fn test_order_only_advertises_escrowed_stock() {
        let mut s = setup();
        let posted = s.market.add_sell_order(&mut s.world, s.first, s.widget, 50, 0);
        assert_eq!(posted, 3);

        let order = s.market.orders()[0];
        assert_eq!(order.qty_available, 3);
        assert_eq!(order.price, 1);
        assert_eq!(s.world.inventory_of(s.first).unwrap().count(s.widget), 0);
    }

    #[test]
    fn test_empty_order_not_posted() {
        let mut s = setup();
        assert_eq!(s.market.add_sell_order(&mut s.world, s.buyer, s.widget, 5, 10), 0);
        assert_eq!(s.market.add_sell_order(&mut s.world, s.first, s.widget, 0, 10), 0);
        assert!(s.market.orders().is_empty());
    }

    #[test]
    fn test_budget_and_quantity_caps() {
        let mut s = setup();
        s.market.add_sell_order(&mut s.world, s.second, s.widget, 10, 4);

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 100, 3);
        assert_eq!(fill, Fill::default());

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 2, 100);
        assert_eq!(fill, Fill { quantity: 2, spent: 8 });
        assert_eq!(s.market.orders()[0].qty_available, 8);
    }

    #[test]
    fn test_min_qty_skips_small_fills() {
        let mut s = setup();
        s.market
            .add_sell_order_with_min(&mut s.world, s.second, s.widget, 10, 5, 2);

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 4, 100);
        assert_eq!(fill.quantity, 0);

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 5, 100);
        assert_eq!(fill, Fill { quantity: 5, spent: 10 });
    }

    #[test]
    fn test_order_below_min_qty_is_withdrawn() {
        let mut s = setup();
        s.market
            .add_sell_order_with_min(&mut s.world, s.second, s.widget, 10, 4, 2);

        // Seven sold leaves three, short of the four-unit minimum.
        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 7, 100);
        assert_eq!(fill, Fill { quantity: 7, spent: 14 });
        assert!(s.market.orders().is_empty());

        let inv = s.world.inventory_of(s.second).unwrap();
        assert_eq!(inv.escrow_count(s.buyer, s.widget), 7);
        assert_eq!(inv.escrow_count(s.second, s.widget), 0);
        assert_eq!(inv.count(s.widget), 3);
    }

    #[test]
    fn test_min_qty_clamped_to_posted_stock() {
        let mut s = setup();
        let posted = s
            .market
            .add_sell_order_with_min(&mut s.world, s.first, s.widget, 10, 8, 2);
        assert_eq!(posted, 3);
        assert_eq!(s.market.orders()[0].min_qty, 3);

        let fill = s.market.buy_now(&mut s.world, s.buyer, s.widget, 3, 100);
        assert_eq!(fill, Fill { quantity: 3, spent: 6 });
        assert!(s.market.orders().is_empty());
    }

    #[test]
    fn test_capped_sink_respects_volume_and_price() {
        let mut s = setup();
        s.market.add_sell_order(&mut s.world, s.first, s.widget, 3, 9);
        s.market.add_sell_order(&mut s.world, s.second, s.widget, 10, 4);

        let sink = s.market.add_sink(s.widget, 5).unwrap();
        s.market.sink_mut(sink).unwrap().max_buys_per_tick = 6;

        let fill = s.market.run_sinks(&mut s.world);
        assert_eq!(fill, Fill { quantity: 6, spent: 24 });

        let sink_entity = s.market.sink_entity();
        assert_eq!(s.world.inventory_of(s.first).unwrap().escrow_count(sink_entity, s.widget), 0);
        assert_eq!(s.world.inventory_of(s.second).unwrap().escrow_count(sink_entity, s.widget), 6);
    }

    #[test]
    fn test_unlimited_sink_clears_affordable_orders() {
        let mut s = setup();
        s.market.add_sell_order(&mut s.world, s.first, s.widget, 3, 2);
        s.market.add_sell_order(&mut s.world, s.second, s.widget, 10, 7);
        s.market.add_sink(s.widget, 2).unwrap();

        let fill = s.market.run_sinks(&mut s.world);
        assert_eq!(fill, Fill { quantity: 3, spent: 6 });
        assert_eq!(s.market.orders().len(), 1);
        assert_eq!(s.market.orders()[0].price, 7);
    }

    #[test]
    fn test_zero_volume_sink_buys_nothing() {
        let mut s = setup();
        s.market.add_sell_order(&mut s.world, s.first, s.widget, 3, 1);
        let sink = s.market.add_sink(s.widget, 100).unwrap();
        s.market.sink_mut(sink).unwrap().max_buys_per_tick = 0;

        assert_eq!(s.market.run_sinks(&mut s.world), Fill::default());
        assert_eq!(s.market.orders()[0].qty_available, 3);
    }
}
