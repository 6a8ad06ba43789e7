//! # Economy
//!
//! The world object that owns everything, and the tick that drives it.
//!
//! ## Tick Order
//!
//! ```text
//! advance clock
//! for each entity that existed when the tick began, in id order:
//!   1. production  - "produces" (itemRate) accumulates and yields items
//!   2. conversion  - "converts" (conversion) runs whole batches
//!   3. selling     - "sells" (itemPrice) escrows stock into a sell order
//! run every market sink once
//! ```
//!
//! The three hook components are looked up by name once per load, never per
//! tick. An entity spawned during a tick is first visited on the next one.

use serde::{Deserialize, Serialize};

use mercantile_core::{
    CommoditySet, Component, ComponentTypeId, CoreResult, EntityId, InternalType, Money, Quantity,
    Tick, World,
};

use crate::config::{ConfigLoader, ConfigValue, LoadSummary};
use crate::conversion::ConversionTable;
use crate::error::EconomyResult;
use crate::market::Market;

/// Name of the built-in entity that sinks buy on behalf of.
const SINK_ENTITY_NAME: &str = "Market Sink";

/// Component ids the tick reads, resolved once after loading.
#[derive(Clone, Copy, Debug, Default)]
struct TickHooks {
    produces: Option<ComponentTypeId>,
    converts: Option<ComponentTypeId>,
    sells: Option<ComponentTypeId>,
}

impl TickHooks {
    fn resolve(world: &World) -> Self {
        Self {
            produces: Self::hook(world, "produces", InternalType::ItemRate),
            converts: Self::hook(world, "converts", InternalType::ConversionRate),
            sells: Self::hook(world, "sells", InternalType::ItemPrice),
        }
    }

    /// Resolves one hook. A hook declared with any shape other than a
    /// single `expected` value would never fire, so it is dropped with a
    /// warning instead.
    fn hook(world: &World, name: &str, expected: InternalType) -> Option<ComponentTypeId> {
        let id = world.resolve_component_type(name)?;
        let def = world.components().get(id)?;
        if def.is_array || def.internal != expected {
            tracing::warn!(
                "Component '{}' is declared as '{}' but the tick reads it as '{}'; it will be ignored",
                name,
                def.shape(),
                expected
            );
            return None;
        }
        Some(id)
    }
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The tick that just ran.
    pub tick: Tick,
    /// Units created by production.
    pub produced: Quantity,
    /// Conversion batches applied.
    pub conversion_batches: Quantity,
    /// Sell orders posted.
    pub orders_posted: usize,
    /// Units escrowed into new sell orders.
    pub units_escrowed: Quantity,
    /// Units bought by sinks.
    pub units_sold: Quantity,
    /// Money spent by sinks.
    pub sink_spend: Money,
}

/// The whole simulation: world, conversions and market.
///
/// # Example
///
/// ```rust
/// use mercantile_economy::Economy;
///
/// let mut economy = Economy::from_json_str(r#"{
///     "component_defs": [
///         {"name": "name", "type": "str"},
///         {"name": "produces", "type": "itemRate"}
///     ],
///     "entity_defs": [{"name": "Item"}, {"name": "Farm"}],
///     "entities": [
///         {"type": "Farm", "comps": [["produces", ["wheat", 1.0]]]},
///         {"type": "Item", "id": "wheat", "comps": [["name", "Wheat"]]}
///     ]
/// }"#).unwrap();
///
/// economy.tick();
/// economy.tick();
/// assert_eq!(economy.commodity_totals().unwrap().get(3), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Economy {
    world: World,
    conversions: ConversionTable,
    market: Market,
    hooks: TickHooks,
}

impl Economy {
    /// Creates an empty economy holding the null entity (id 0) and the
    /// market sink entity (id 1).
    #[must_use]
    pub fn new() -> Self {
        let (world, sink_entity) = World::with_holder(SINK_ENTITY_NAME);

        Self {
            world,
            conversions: ConversionTable::new(),
            market: Market::new(sink_entity),
            hooks: TickHooks::default(),
        }
    }

    /// Creates an economy from a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or does not load.
    pub fn from_json_str(text: &str) -> EconomyResult<Self> {
        let mut economy = Self::new();
        economy.load_json_str(text)?;
        Ok(economy)
    }

    /// Creates an economy from a TOML config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or does not load.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        let mut economy = Self::new();
        economy.load_toml_str(text)?;
        Ok(economy)
    }

    /// Loads a JSON config document into this economy.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Json` for malformed JSON, or any loader error.
    pub fn load_json_str(&mut self, text: &str) -> EconomyResult<LoadSummary> {
        let root: serde_json::Value = serde_json::from_str(text)?;
        self.load_config(&root)
    }

    /// Loads a TOML config document into this economy. The TOML form has
    /// the same keys and nesting as the JSON one.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::Toml` for malformed TOML, or any loader error.
    pub fn load_toml_str(&mut self, text: &str) -> EconomyResult<LoadSummary> {
        let root: toml::Value = toml::from_str(text)?;
        self.load_config(&root)
    }

    /// Loads an already parsed config document.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; the economy should then be discarded.
    pub fn load_config<V: ConfigValue>(&mut self, root: &V) -> EconomyResult<LoadSummary> {
        let summary =
            ConfigLoader::new(&mut self.world, &mut self.conversions, &mut self.market).load(root)?;
        self.hooks = TickHooks::resolve(&self.world);
        Ok(summary)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the world.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Returns the world for mutation.
    ///
    /// Registering a "produces", "converts" or "sells" component type here
    /// takes effect after [`Economy::refresh_hooks`].
    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Returns the conversion table.
    #[inline]
    #[must_use]
    pub const fn conversions(&self) -> &ConversionTable {
        &self.conversions
    }

    /// Returns the conversion table for mutation.
    #[inline]
    pub fn conversions_mut(&mut self) -> &mut ConversionTable {
        &mut self.conversions
    }

    /// Returns the market.
    #[inline]
    #[must_use]
    pub const fn market(&self) -> &Market {
        &self.market
    }

    /// Returns the market together with the world it trades in.
    #[inline]
    pub fn market_mut(&mut self) -> (&mut Market, &mut World) {
        (&mut self.market, &mut self.world)
    }

    /// Returns the entity that sinks buy on behalf of.
    #[inline]
    #[must_use]
    pub const fn sink_entity(&self) -> EntityId {
        self.market.sink_entity()
    }

    /// Returns the current tick.
    #[inline]
    #[must_use]
    pub const fn current_tick(&self) -> Tick {
        self.world.tick()
    }

    /// Re-resolves the component types the tick reads.
    pub fn refresh_hooks(&mut self) {
        self.hooks = TickHooks::resolve(&self.world);
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances the simulation by one tick.
    pub fn tick(&mut self) -> TickReport {
        let tick = self.world.advance_tick();
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        // Captured up front: entities created mid-tick wait for the next one.
        let entity_count = u32::try_from(self.world.entity_count()).unwrap_or(u32::MAX);
        for raw in 0..entity_count {
            let entity = EntityId::new(raw);
            self.run_production(entity, &mut report);
            self.run_conversion(entity, &mut report);
            self.run_selling(entity, &mut report);
        }

        let fill = self.market.run_sinks(&mut self.world);
        report.units_sold = fill.quantity;
        report.sink_spend = fill.spent;

        tracing::trace!(
            tick = report.tick,
            produced = report.produced,
            batches = report.conversion_batches,
            orders = report.orders_posted,
            sold = report.units_sold,
            "tick complete"
        );
        report
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run_production(&mut self, entity: EntityId, report: &mut TickReport) {
        let Some(produces) = self.hooks.produces else {
            return;
        };
        let Some(rate) = self
            .world
            .get_component_mut(entity, produces)
            .and_then(Component::item_rate_mut)
        else {
            return;
        };
        if rate.rate.is_nan() || rate.rate <= 0.0 {
            return;
        }

        rate.accumulator += 1.0;
        if rate.accumulator < rate.rate {
            return;
        }
        let units = (rate.accumulator / rate.rate).floor();
        rate.accumulator -= rate.rate * units;

        let item = rate.item;
        if item.is_null() {
            return;
        }
        let units = units as Quantity;
        if self.world.add_item(entity, item, units).is_ok() {
            report.produced += units;
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn run_conversion(&mut self, entity: EntityId, report: &mut TickReport) {
        let Some(converts) = self.hooks.converts else {
            return;
        };
        let Some(conv_rate) = self
            .world
            .get_component_mut(entity, converts)
            .and_then(Component::conversion_rate_mut)
        else {
            return;
        };
        if conv_rate.rate.is_nan() || conv_rate.rate <= 0.0 {
            return;
        }

        // The accumulator keeps growing while inputs are short.
        conv_rate.accumulator += 1.0;
        if conv_rate.accumulator < conv_rate.rate {
            return;
        }
        let due = (conv_rate.accumulator / conv_rate.rate).floor() as Quantity;
        let rate = conv_rate.rate;
        let Some(conversion) = conv_rate.conversion.and_then(|id| self.conversions.get(id)) else {
            return;
        };

        let Some(inventory) = self.world.inventory_of_mut(entity) else {
            return;
        };
        let available = conversion.max_applicable(inventory);
        if available <= 0 {
            return;
        }
        let batches = due.min(available);
        conversion.apply(inventory, batches);
        report.conversion_batches += batches;

        if let Some(conv_rate) = self
            .world
            .get_component_mut(entity, converts)
            .and_then(Component::conversion_rate_mut)
        {
            conv_rate.accumulator -= rate * batches as f64;
        }
    }

    fn run_selling(&mut self, entity: EntityId, report: &mut TickReport) {
        let Some(sells) = self.hooks.sells else {
            return;
        };
        let Some(offer) = self
            .world
            .get_component(entity, sells)
            .and_then(Component::item_price)
            .copied()
        else {
            return;
        };

        let stock = self
            .world
            .inventory_of(entity)
            .map_or(0, |inv| inv.count(offer.item));
        if stock <= 0 {
            return;
        }

        let escrowed = self
            .market
            .add_sell_order(&mut self.world, entity, offer.item, stock, offer.price);
        if escrowed > 0 {
            report.orders_posted += 1;
            report.units_escrowed += escrowed;
        }
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Sums the general-pool stock of every item across all inventories.
    ///
    /// A fused inventory is counted once. Buckets are keyed by the item's
    /// raw entity id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::CommoditySetFull` only if the set was sized too
    /// small, which cannot happen for ids below the entity count.
    pub fn commodity_totals(&self) -> CoreResult<CommoditySet> {
        let mut totals = CommoditySet::with_capacity(self.world.entity_count());
        for (_, inventory) in self.world.inventories().iter() {
            for stock in inventory.items() {
                totals.add(stock.item.raw(), stock.count, true)?;
            }
        }
        Ok(totals)
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercantile_core::{ConversionRate, ItemPrice, ItemRate};

    use crate::conversion::ConversionLine;

    struct Farmstead {
        economy: Economy,
        wheat: EntityId,
        flour: EntityId,
        farm: EntityId,
    }

    fn farmstead(rate: f64) -> Farmstead {
        let mut economy = Economy::new();
        let world = economy.world_mut();
        let produces = world
            .register_component_type("produces", InternalType::ItemRate, false)
            .unwrap();
        world
            .register_component_type("converts", InternalType::ConversionRate, false)
            .unwrap();
        world
            .register_component_type("sells", InternalType::ItemPrice, false)
            .unwrap();
        let item = world.register_entity_def("Item", None).unwrap();
        let site = world.register_entity_def("Farm", None).unwrap();

        let wheat = world.create_entity(item, "wheat").unwrap();
        let flour = world.create_entity(item, "flour").unwrap();
        let farm = world.create_entity(site, "farm").unwrap();
        world
            .set_component(
                farm,
                produces,
                ItemRate {
                    item: wheat,
                    rate,
                    accumulator: 0.0,
                }
                .into(),
            )
            .unwrap();
        economy.refresh_hooks();

        Farmstead {
            economy,
            wheat,
            flour,
            farm,
        }
    }

    fn stock(economy: &Economy, entity: EntityId, item: EntityId) -> Quantity {
        economy.world().inventory_of(entity).map_or(0, |inv| inv.count(item))
    }

    #[test]
    fn test_builtin_entities() {
        let economy = Economy::new();
        assert_eq!(economy.world().entity_count(), 2);
        assert_eq!(economy.sink_entity(), EntityId::new(1));
        assert!(economy.world().inventory_of(economy.sink_entity()).is_some());
    }

    #[test]
    fn test_misshapen_hooks_are_dropped() {
        let mut economy = Economy::from_json_str(
            r#"{
            "component_defs": [
                {"name": "produces", "type": "^itemRate"},
                {"name": "sells", "type": "int"}
            ],
            "entity_defs": [{"name": "Item"}, {"name": "Farm"}],
            "entities": [
                {"type": "Item", "id": "wheat"},
                {"type": "Farm", "id": "farm", "comps": [
                    ["produces", [["wheat", 1.0]]],
                    ["sells", 3]
                ]}
            ]
        }"#,
        )
        .unwrap();

        assert!(economy.hooks.produces.is_none());
        assert!(economy.hooks.sells.is_none());
        assert!(economy.hooks.converts.is_none());

        let report = economy.tick();
        assert_eq!(report.produced, 0);
        assert_eq!(report.orders_posted, 0);
    }

    #[test]
    fn test_slow_production_accumulates() {
        let mut f = farmstead(3.0);

        f.economy.tick();
        f.economy.tick();
        assert_eq!(stock(&f.economy, f.farm, f.wheat), 0);

        let report = f.economy.tick();
        assert_eq!(report.tick, 3);
        assert_eq!(report.produced, 1);
        assert_eq!(stock(&f.economy, f.farm, f.wheat), 1);
    }

    #[test]
    fn test_fast_production_yields_several_per_tick() {
        let mut f = farmstead(0.25);
        let report = f.economy.tick();
        assert_eq!(report.produced, 4);
        assert_eq!(stock(&f.economy, f.farm, f.wheat), 4);
    }

    #[test]
    fn test_non_positive_rate_produces_nothing() {
        for rate in [0.0, -1.0, f64::NAN] {
            let mut f = farmstead(rate);
            for _ in 0..5 {
                f.economy.tick();
            }
            assert_eq!(stock(&f.economy, f.farm, f.wheat), 0);
        }
    }

    #[test]
    fn test_conversion_waits_for_inputs() {
        let mut f = farmstead(1.0);
        let mill = f
            .economy
            .conversions_mut()
            .add(
                "mill",
                vec![ConversionLine::new(f.wheat, 2)],
                vec![ConversionLine::new(f.flour, 1)],
            )
            .unwrap();
        let converts = f.economy.world().resolve_component_type("converts").unwrap();
        f.economy
            .world_mut()
            .set_component(
                f.farm,
                converts,
                ConversionRate {
                    conversion: Some(mill),
                    rate: 1.0,
                    accumulator: 0.0,
                }
                .into(),
            )
            .unwrap();

        // Tick 1: one wheat grown, not enough to mill.
        let report = f.economy.tick();
        assert_eq!(report.conversion_batches, 0);

        // Tick 2: two wheat, one batch.
        let report = f.economy.tick();
        assert_eq!(report.conversion_batches, 1);
        assert_eq!(stock(&f.economy, f.farm, f.wheat), 0);
        assert_eq!(stock(&f.economy, f.farm, f.flour), 1);
    }

    #[test]
    fn test_selling_escrows_stock_for_sinks() {
        let mut f = farmstead(1.0);
        let sells = f.economy.world().resolve_component_type("sells").unwrap();
        f.economy
            .world_mut()
            .set_component(
                f.farm,
                sells,
                ItemPrice {
                    item: f.wheat,
                    price: 4,
                }
                .into(),
            )
            .unwrap();
        let (market, _) = f.economy.market_mut();
        let sink = market.add_sink(f.wheat, 5).unwrap();
        market.sink_mut(sink).unwrap().max_buys_per_tick = 1;

        let report = f.economy.tick();
        assert_eq!(report.orders_posted, 1);
        assert_eq!(report.units_escrowed, 1);
        assert_eq!(report.units_sold, 1);
        assert_eq!(report.sink_spend, 4);

        let sink_entity = f.economy.sink_entity();
        let inv = f.economy.world().inventory_of(f.farm).unwrap();
        assert_eq!(inv.count(f.wheat), 0);
        assert_eq!(inv.escrow_count(sink_entity, f.wheat), 1);
        assert!(f.economy.market().orders().is_empty());
    }

    #[test]
    fn test_commodity_totals_skip_empty_stock() {
        let mut f = farmstead(1.0);
        f.economy.tick();
        f.economy.tick();

        let totals = f.economy.commodity_totals().unwrap();
        assert_eq!(totals.get(f.wheat.raw()), 2);
        assert_eq!(totals.get(f.flour.raw()), 0);
        assert_eq!(totals.len(), 1);
    }
}
