//! # Configuration Loader
//!
//! Builds a world from a config document in one pass plus two fixup passes.
//!
//! ## Document Layout
//!
//! ```text
//! component_defs  [{name, type}]                 "^" prefix marks arrays
//! entity_defs     [{name, fusedInv?}]
//! entities        [{type, id?, comps: [[name, value]], inv?: [[item, count]]}]
//! conversions     [{name, id?, input: [[item, count]], output: [[item, count]]}]
//! market.sinks    [{name, item, maxBuyPrice, maxBuysPerTick}]
//! ```
//!
//! ## Deferred References
//!
//! Entities and conversions are referred to by string alias, and an alias
//! may be used before the object that declares it. Every reference is
//! recorded as a fixup (alias plus the slot it patches) and resolved
//! after everything exists. Unknown aliases are logged and skipped; unknown
//! entity types and component names abort the load.

use std::collections::HashMap;

use mercantile_core::{
    Component, ComponentTypeId, ComponentValue, ConversionId, ConversionRate, EntityId, InternalType,
    ItemPrice, ItemRate, Quantity, RoadConnect, RoadSpan, World,
};

use crate::config::value::ConfigValue;
use crate::conversion::{ConversionLine, ConversionTable};
use crate::error::{EconomyError, EconomyResult};
use crate::market::{Market, SinkId};

/// Counts reported after a successful load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Component types registered.
    pub component_defs: usize,
    /// Entity types registered.
    pub entity_defs: usize,
    /// Entities created.
    pub entities: usize,
    /// Conversions created.
    pub conversions: usize,
    /// Sinks created.
    pub sinks: usize,
    /// Deferred references resolved.
    pub fixups_applied: usize,
    /// Deferred references dropped because the alias was unknown.
    pub fixups_skipped: usize,
    /// Inventory fusions performed.
    pub fusions: usize,
}

/// Entity-valued field inside a component value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefField {
    Id,
    ItemRateItem,
    ItemPriceItem,
    RoadConnectA,
    RoadConnectB,
}

/// Where a resolved alias gets written.
#[derive(Clone, Copy, Debug)]
enum FixupTarget {
    /// Entity reference inside a component (or one element of an array).
    Component {
        entity: EntityId,
        type_id: ComponentTypeId,
        element: Option<usize>,
        field: RefField,
    },
    /// Conversion reference inside a conversion-rate component.
    ConversionRef {
        entity: EntityId,
        type_id: ComponentTypeId,
        element: Option<usize>,
    },
    /// Item stocked in an entity's starting inventory.
    InventoryItem { entity: EntityId, count: Quantity },
    /// Item of a conversion input line.
    ConversionInput { conversion: ConversionId, line: usize },
    /// Item of a conversion output line.
    ConversionOutput { conversion: ConversionId, line: usize },
    /// Item bought by a sink.
    SinkItem { sink: SinkId },
}

/// A string alias waiting to be resolved.
#[derive(Clone, Debug)]
struct Fixup {
    alias: String,
    target: FixupTarget,
}

/// Single-use loader over the parts of an economy.
pub struct ConfigLoader<'a> {
    world: &'a mut World,
    conversions: &'a mut ConversionTable,
    market: &'a mut Market,
    entity_aliases: HashMap<String, EntityId>,
    conversion_aliases: HashMap<String, ConversionId>,
    fixups: Vec<Fixup>,
    summary: LoadSummary,
}

impl<'a> ConfigLoader<'a> {
    /// Creates a loader that populates the given world, conversion table
    /// and market.
    pub fn new(
        world: &'a mut World,
        conversions: &'a mut ConversionTable,
        market: &'a mut Market,
    ) -> Self {
        Self {
            world,
            conversions,
            market,
            entity_aliases: HashMap::new(),
            conversion_aliases: HashMap::new(),
            fixups: Vec::new(),
            summary: LoadSummary::default(),
        }
    }

    /// Loads a whole document.
    ///
    /// Every section is optional. On error the targets are left partly
    /// populated and should be discarded.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-object root, a section of the wrong shape,
    /// an unknown entity type or component name, a bad component type
    /// string, a value of the wrong shape, or an invalid conversion.
    pub fn load<V: ConfigValue>(mut self, root: &V) -> EconomyResult<LoadSummary> {
        if !root.is_object() {
            return Err(EconomyError::MalformedRoot);
        }

        if let Some(defs) = section(root, "component_defs")? {
            for def in defs {
                self.load_component_def(def)?;
            }
        }
        if let Some(defs) = section(root, "entity_defs")? {
            for def in defs {
                self.load_entity_def(def)?;
            }
        }
        if let Some(entities) = section(root, "entities")? {
            for entity in entities {
                self.load_entity(entity)?;
            }
        }
        if let Some(conversions) = section(root, "conversions")? {
            for conversion in conversions {
                self.load_conversion(conversion)?;
            }
        }
        if let Some(market) = root.get_key("market") {
            if !market.is_object() {
                return Err(EconomyError::InvalidSection {
                    section: "market",
                    expected: "an object",
                });
            }
            if let Some(sinks) = section(market, "sinks")? {
                for sink in sinks {
                    self.load_sink(sink)?;
                }
            }
        }

        self.apply_fixups();
        self.fuse_inventories()?;

        let s = self.summary;
        tracing::info!(
            component_defs = s.component_defs,
            entity_defs = s.entity_defs,
            entities = s.entities,
            conversions = s.conversions,
            sinks = s.sinks,
            fixups_applied = s.fixups_applied,
            fixups_skipped = s.fixups_skipped,
            fusions = s.fusions,
            "economy config loaded"
        );
        Ok(s)
    }

    // =========================================================================
    // Schema
    // =========================================================================

    fn load_component_def<V: ConfigValue>(&mut self, def: &V) -> EconomyResult<()> {
        let name = def
            .get_text("name")
            .ok_or_else(|| EconomyError::invalid_value("component_defs", "missing name"))?;
        let type_str = def.get_text("type").unwrap_or_default();

        let (is_array, base) = match type_str.strip_prefix('^') {
            Some(base) => (true, base),
            None => (false, type_str),
        };
        let internal = InternalType::from_name(base).ok_or_else(|| {
            EconomyError::InvalidComponentType {
                component: name.to_string(),
                type_name: type_str.to_string(),
            }
        })?;

        self.world.register_component_type(name, internal, is_array)?;
        self.summary.component_defs += 1;
        Ok(())
    }

    fn load_entity_def<V: ConfigValue>(&mut self, def: &V) -> EconomyResult<()> {
        let name = def
            .get_text("name")
            .ok_or_else(|| EconomyError::invalid_value("entity_defs", "missing name"))?;

        let fused = match def.get_text("fusedInv") {
            Some(comp_name) => {
                let type_id = self.component_type(comp_name)?;
                let is_id = self
                    .world
                    .components()
                    .get(type_id)
                    .is_some_and(|d| d.internal == InternalType::Id && !d.is_array);
                if !is_id {
                    return Err(EconomyError::invalid_value(
                        format!("fusedInv of '{name}'"),
                        format!("component '{comp_name}' is not an id component"),
                    ));
                }
                Some(type_id)
            }
            None => None,
        };

        self.world.register_entity_def(name, fused)?;
        self.summary.entity_defs += 1;
        Ok(())
    }

    fn component_type(&self, name: &str) -> EconomyResult<ComponentTypeId> {
        self.world
            .resolve_component_type(name)
            .ok_or_else(|| EconomyError::UnknownComponent(name.to_string()))
    }

    // =========================================================================
    // Entities
    // =========================================================================

    fn load_entity<V: ConfigValue>(&mut self, entry: &V) -> EconomyResult<()> {
        let type_name = entry.get_text("type").unwrap_or_default();
        let type_id = self
            .world
            .entity_type_by_name(type_name)
            .ok_or_else(|| EconomyError::UnknownEntityType(type_name.to_string()))?;

        let alias = entry.get_text("id");
        let entity = self
            .world
            .create_entity(type_id, alias.unwrap_or(type_name))?;
        if let Some(alias) = alias {
            if self.entity_aliases.insert(alias.to_string(), entity).is_some() {
                tracing::warn!("Duplicate entity alias '{}', the later entity wins", alias);
            }
        }
        self.summary.entities += 1;

        if let Some(comps) = entry.get_key("comps") {
            let comps = comps
                .elements()
                .ok_or_else(|| EconomyError::invalid_value("comps", "expected an array"))?;
            for pair in comps {
                self.load_component(entity, pair)?;
            }
        }

        if let Some(inv) = entry.get_key("inv") {
            let lines = inv
                .elements()
                .ok_or_else(|| EconomyError::invalid_value("inv", "expected an array"))?;
            self.world.ensure_inventory(entity)?;
            for line in lines {
                let (alias, count) = parse_line("inv", line)?;
                self.defer(alias, FixupTarget::InventoryItem { entity, count });
            }
        }

        Ok(())
    }

    fn load_component<V: ConfigValue>(&mut self, entity: EntityId, pair: &V) -> EconomyResult<()> {
        let pair = pair
            .elements()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| EconomyError::invalid_value("comps", "expected [name, value]"))?;
        let name = pair[0]
            .as_text()
            .ok_or_else(|| EconomyError::invalid_value("comps", "component name must be a string"))?;
        let type_id = self.component_type(name)?;
        let (internal, is_array) = match self.world.components().get(type_id) {
            Some(def) => (def.internal, def.is_array),
            None => return Err(EconomyError::UnknownComponent(name.to_string())),
        };

        let raw = &pair[1];
        let value = if is_array {
            let elements = raw.elements().ok_or_else(|| {
                EconomyError::invalid_value(name, format!("expected an array of {internal}"))
            })?;
            let mut list = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                list.push(self.parse_value(name, internal, element, entity, type_id, Some(index))?);
            }
            ComponentValue::List(list)
        } else {
            self.parse_value(name, internal, raw, entity, type_id, None)?
        };

        self.world.set_component(entity, type_id, value)?;
        Ok(())
    }

    /// Parses one value of `internal`, deferring any alias it carries.
    fn parse_value<V: ConfigValue>(
        &mut self,
        name: &str,
        internal: InternalType,
        raw: &V,
        entity: EntityId,
        type_id: ComponentTypeId,
        element: Option<usize>,
    ) -> EconomyResult<ComponentValue> {
        let bad = |reason: &str| EconomyError::invalid_value(name, reason);
        let refer = |field| FixupTarget::Component {
            entity,
            type_id,
            element,
            field,
        };

        let value: ComponentValue = match internal {
            InternalType::Int => raw.as_int().ok_or_else(|| bad("expected an integer"))?.into(),
            InternalType::Float => raw.as_float().ok_or_else(|| bad("expected a number"))?.into(),
            InternalType::Str => raw.as_text().ok_or_else(|| bad("expected a string"))?.into(),
            InternalType::Id => {
                let alias = raw.as_text().ok_or_else(|| bad("expected an entity alias"))?;
                self.defer(alias, refer(RefField::Id));
                EntityId::NULL.into()
            }
            InternalType::ItemRate => {
                let parts = tuple(raw, 2).ok_or_else(|| bad("expected [item, rate]"))?;
                let alias = parts[0].as_text().ok_or_else(|| bad("item must be an alias"))?;
                let rate = parts[1].as_float().ok_or_else(|| bad("rate must be a number"))?;
                self.defer(alias, refer(RefField::ItemRateItem));
                ItemRate {
                    item: EntityId::NULL,
                    rate,
                    accumulator: 0.0,
                }
                .into()
            }
            InternalType::ItemPrice => {
                let parts = tuple(raw, 2).ok_or_else(|| bad("expected [item, price]"))?;
                let alias = parts[0].as_text().ok_or_else(|| bad("item must be an alias"))?;
                let price = parts[1].as_int().ok_or_else(|| bad("price must be a number"))?;
                self.defer(alias, refer(RefField::ItemPriceItem));
                ItemPrice {
                    item: EntityId::NULL,
                    price,
                }
                .into()
            }
            InternalType::ConversionRate => {
                let parts = tuple(raw, 2).ok_or_else(|| bad("expected [rate, conversion]"))?;
                let rate = parts[0].as_float().ok_or_else(|| bad("rate must be a number"))?;
                let alias = parts[1]
                    .as_text()
                    .ok_or_else(|| bad("conversion must be an alias"))?;
                self.defer(
                    alias,
                    FixupTarget::ConversionRef {
                        entity,
                        type_id,
                        element,
                    },
                );
                ConversionRate {
                    conversion: None,
                    rate,
                    accumulator: 0.0,
                }
                .into()
            }
            InternalType::RoadSpan => {
                let parts = tuple(raw, 4).ok_or_else(|| bad("expected [ax, ay, bx, by]"))?;
                let mut coords = [0.0; 4];
                for (slot, part) in coords.iter_mut().zip(parts) {
                    *slot = part.as_float().ok_or_else(|| bad("coordinates must be numbers"))?;
                }
                RoadSpan {
                    a: [coords[0], coords[1]],
                    b: [coords[2], coords[3]],
                }
                .into()
            }
            InternalType::RoadConnect => {
                let parts = tuple(raw, 2).ok_or_else(|| bad("expected [road, road]"))?;
                let a = parts[0].as_text().ok_or_else(|| bad("roads must be aliases"))?;
                let b = parts[1].as_text().ok_or_else(|| bad("roads must be aliases"))?;
                self.defer(a, refer(RefField::RoadConnectA));
                self.defer(b, refer(RefField::RoadConnectB));
                RoadConnect::default().into()
            }
        };
        Ok(value)
    }

    // =========================================================================
    // Conversions and market
    // =========================================================================

    fn load_conversion<V: ConfigValue>(&mut self, entry: &V) -> EconomyResult<()> {
        let name = entry.get_text("name").unwrap_or_default();

        let parse_lines = |key: &str| -> EconomyResult<Vec<(String, Quantity)>> {
            let lines = entry
                .get_key(key)
                .and_then(ConfigValue::elements)
                .filter(|l| !l.is_empty())
                .ok_or_else(|| EconomyError::invalid_conversion(name, format!("invalid {key}")))?;
            lines
                .iter()
                .map(|line| parse_line(key, line).map(|(alias, count)| (alias.to_string(), count)))
                .collect()
        };
        let inputs = parse_lines("input")?;
        let outputs = parse_lines("output")?;

        let id = self.conversions.add(
            name,
            inputs
                .iter()
                .map(|&(_, count)| ConversionLine::new(EntityId::NULL, count))
                .collect(),
            outputs
                .iter()
                .map(|&(_, count)| ConversionLine::new(EntityId::NULL, count))
                .collect(),
        )?;
        for (line, (alias, _)) in inputs.iter().enumerate() {
            self.defer(alias, FixupTarget::ConversionInput { conversion: id, line });
        }
        for (line, (alias, _)) in outputs.iter().enumerate() {
            self.defer(alias, FixupTarget::ConversionOutput { conversion: id, line });
        }

        if let Some(alias) = entry.get_text("id") {
            if self.conversion_aliases.insert(alias.to_string(), id).is_some() {
                tracing::warn!("Duplicate conversion alias '{}', the later conversion wins", alias);
            }
        }
        self.summary.conversions += 1;
        Ok(())
    }

    fn load_sink<V: ConfigValue>(&mut self, entry: &V) -> EconomyResult<()> {
        let sink = self
            .market
            .add_sink(EntityId::NULL, entry.get_int_or("maxBuyPrice", 0))?;
        if let Some(s) = self.market.sink_mut(sink) {
            s.name = entry.get_text("name").unwrap_or_default().to_string();
            s.max_buys_per_tick = entry.get_int_or("maxBuysPerTick", -1);
        }

        match entry.get_text("item") {
            Some(alias) => self.defer(alias, FixupTarget::SinkItem { sink }),
            None => tracing::warn!("Sink {} has no item and will never buy", sink),
        }
        self.summary.sinks += 1;
        Ok(())
    }

    // =========================================================================
    // Fixup and fusion passes
    // =========================================================================

    fn defer(&mut self, alias: &str, target: FixupTarget) {
        tracing::debug!("Deferring '{}' for {:?}", alias, target);
        self.fixups.push(Fixup {
            alias: alias.to_string(),
            target,
        });
    }

    fn apply_fixups(&mut self) {
        for fixup in std::mem::take(&mut self.fixups) {
            let applied = match fixup.target {
                FixupTarget::ConversionRef {
                    entity,
                    type_id,
                    element,
                } => match self.conversion_aliases.get(&fixup.alias) {
                    Some(&conversion) => self.patch_conversion_ref(entity, type_id, element, conversion),
                    None => {
                        tracing::warn!("Unknown conversion reference: '{}'", fixup.alias);
                        false
                    }
                },
                target => match self.entity_aliases.get(&fixup.alias) {
                    Some(&id) => self.patch_entity_ref(target, id),
                    None => {
                        tracing::warn!("Unknown entity reference: '{}'", fixup.alias);
                        false
                    }
                },
            };

            if applied {
                self.summary.fixups_applied += 1;
            } else {
                self.summary.fixups_skipped += 1;
            }
        }
    }

    fn patch_entity_ref(&mut self, target: FixupTarget, id: EntityId) -> bool {
        match target {
            FixupTarget::Component {
                entity,
                type_id,
                element,
                field,
            } => {
                let Some(slot) = self.value_slot(entity, type_id, element) else {
                    return false;
                };
                match (field, slot) {
                    (RefField::Id, ComponentValue::Id(slot)) => *slot = id,
                    (RefField::ItemRateItem, ComponentValue::ItemRate(rate)) => rate.item = id,
                    (RefField::ItemPriceItem, ComponentValue::ItemPrice(price)) => price.item = id,
                    (RefField::RoadConnectA, ComponentValue::RoadConnect(road)) => road.a = id,
                    (RefField::RoadConnectB, ComponentValue::RoadConnect(road)) => road.b = id,
                    _ => return false,
                }
                true
            }
            FixupTarget::InventoryItem { entity, count } => {
                self.world.add_item(entity, id, count).is_ok()
            }
            FixupTarget::ConversionInput { conversion, line } => {
                let Some(slot) = self
                    .conversions
                    .get_mut(conversion)
                    .and_then(|c| c.inputs.get_mut(line))
                else {
                    return false;
                };
                slot.item = id;
                true
            }
            FixupTarget::ConversionOutput { conversion, line } => {
                let Some(slot) = self
                    .conversions
                    .get_mut(conversion)
                    .and_then(|c| c.outputs.get_mut(line))
                else {
                    return false;
                };
                slot.item = id;
                true
            }
            FixupTarget::SinkItem { sink } => {
                let Some(slot) = self.market.sink_mut(sink) else {
                    return false;
                };
                slot.item = id;
                true
            }
            FixupTarget::ConversionRef { .. } => false,
        }
    }

    fn patch_conversion_ref(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
        element: Option<usize>,
        conversion: ConversionId,
    ) -> bool {
        match self.value_slot(entity, type_id, element) {
            Some(ComponentValue::ConversionRate(rate)) => {
                rate.conversion = Some(conversion);
                true
            }
            _ => false,
        }
    }

    fn value_slot(
        &mut self,
        entity: EntityId,
        type_id: ComponentTypeId,
        element: Option<usize>,
    ) -> Option<&mut ComponentValue> {
        let component = self.world.get_component_mut(entity, type_id)?;
        match (element, &mut component.value) {
            (None, value) => Some(value),
            (Some(index), ComponentValue::List(elements)) => elements.get_mut(index),
            (Some(_), _) => None,
        }
    }

    fn fuse_inventories(&mut self) -> EconomyResult<()> {
        let mut pairs = Vec::new();
        for entity in self.world.entities() {
            let Some(fused) = entity
                .type_id
                .and_then(|t| self.world.entity_def(t))
                .and_then(|d| d.fused_inventory)
            else {
                continue;
            };

            let location = entity.get_component(fused).and_then(Component::as_id);
            match location {
                Some(location) if !location.is_null() && self.world.entity(location).is_some() => {
                    pairs.push((location, entity.id));
                }
                _ => tracing::warn!(
                    "Entity {} ('{}') has no location to fuse its inventory with",
                    entity.id,
                    entity.name
                ),
            }
        }

        for (location, entity) in pairs {
            self.world.fuse_inventories(location, entity)?;
            self.summary.fusions += 1;
        }
        Ok(())
    }
}

/// Returns the elements of an optional top-level array section.
fn section<'v, V: ConfigValue>(parent: &'v V, key: &'static str) -> EconomyResult<Option<&'v [V]>> {
    match parent.get_key(key) {
        None => Ok(None),
        Some(value) => value.elements().map(Some).ok_or(EconomyError::InvalidSection {
            section: key,
            expected: "an array",
        }),
    }
}

/// Returns the first `len` elements of an array holding at least that many.
fn tuple<V: ConfigValue>(raw: &V, len: usize) -> Option<&[V]> {
    raw.elements().filter(|p| p.len() >= len).map(|p| &p[..len])
}

/// Parses an `[alias, count]` line; the count is the last element.
fn parse_line<'v, V: ConfigValue>(context: &str, line: &'v V) -> EconomyResult<(&'v str, Quantity)> {
    let parts = line
        .elements()
        .filter(|p| p.len() >= 2)
        .ok_or_else(|| EconomyError::invalid_value(context, "expected [item, count]"))?;
    let alias = parts[0]
        .as_text()
        .ok_or_else(|| EconomyError::invalid_value(context, "item must be an alias"))?;
    let count = parts[parts.len() - 1]
        .as_int()
        .ok_or_else(|| EconomyError::invalid_value(context, "count must be a number"))?;
    Ok((alias, count))
}
