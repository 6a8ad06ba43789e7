//! # Component System
//!
//! Component types are data, not Rust types: a [`CompDef`] names a component
//! and picks one [`InternalType`] for its storage. Values are carried by the
//! [`ComponentValue`] sum type, and the declared internal type decides which
//! variant a component may hold.
//!
//! Payloads flagged as heap allocated (item rates, prices, conversion rates,
//! road geometry) are boxed so the common scalar components stay small.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Money amounts, in whole currency units.
pub type Money = i64;

/// Identifier of a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    /// Creates a component type id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the index into the component registry.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a conversion recipe, referenced by conversion-rate
/// components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConversionId(u32);

impl ConversionId {
    /// Creates a conversion id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the index into the conversion table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage shape of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternalType {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Reference to another entity.
    Id,
    /// Owned string.
    Str,
    /// Item produced at a rate, with an accumulator.
    ItemRate,
    /// Item offered at a price.
    ItemPrice,
    /// Conversion applied at a rate, with an accumulator.
    ConversionRate,
    /// Straight road segment between two points.
    RoadSpan,
    /// Connection between two road entities.
    RoadConnect,
}

impl InternalType {
    /// Every internal type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Int,
        Self::Float,
        Self::Id,
        Self::Str,
        Self::ItemRate,
        Self::ItemPrice,
        Self::ConversionRate,
        Self::RoadSpan,
        Self::RoadConnect,
    ];

    /// Returns the name used for this type in configuration documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Id => "id",
            Self::Str => "str",
            Self::ItemRate => "itemRate",
            Self::ItemPrice => "itemPrice",
            Self::ConversionRate => "conversion",
            Self::RoadSpan => "roadspan",
            Self::RoadConnect => "roadconnect",
        }
    }

    /// Parses a configuration type name (without the `^` array marker).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether values of this type live behind their own heap allocation.
    #[must_use]
    pub const fn is_heap_allocated(self) -> bool {
        matches!(
            self,
            Self::ItemRate | Self::ItemPrice | Self::ConversionRate | Self::RoadSpan | Self::RoadConnect
        )
    }
}

impl fmt::Display for InternalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of a component type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompDef {
    /// Index in the component registry.
    pub id: ComponentTypeId,
    /// Component name used by configuration and lookups.
    pub name: String,
    /// Storage shape of each value.
    pub internal: InternalType,
    /// Whether the component holds a list of values.
    pub is_array: bool,
    /// Whether the payload is boxed.
    pub is_heap_allocated: bool,
}

impl CompDef {
    /// Creates a component declaration.
    #[must_use]
    pub fn new(id: ComponentTypeId, name: String, internal: InternalType, is_array: bool) -> Self {
        Self {
            id,
            name,
            internal,
            is_array,
            is_heap_allocated: internal.is_heap_allocated(),
        }
    }

    /// Describes the accepted value shape, e.g. `int` or `^itemRate`.
    #[must_use]
    pub fn shape(&self) -> String {
        if self.is_array {
            format!("^{}", self.internal)
        } else {
            self.internal.name().to_string()
        }
    }
}

/// An item produced every `rate` ticks.
///
/// The accumulator gains one per tick; each whole multiple of `rate` yields
/// one unit, so rates below 1 produce several units per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRate {
    /// Item entity produced.
    pub item: EntityId,
    /// Ticks per unit.
    pub rate: f64,
    /// Ticks accumulated toward the next unit.
    pub accumulator: f64,
}

/// An item offered for sale at a unit price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrice {
    /// Item entity sold.
    pub item: EntityId,
    /// Unit price.
    pub price: Money,
}

/// A conversion run every `rate` ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionRate {
    /// Conversion applied, `None` until resolved.
    pub conversion: Option<ConversionId>,
    /// Ticks per batch.
    pub rate: f64,
    /// Ticks accumulated toward the next batch.
    pub accumulator: f64,
}

/// A road segment from `a` to `b`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadSpan {
    /// Start point `(x, y)`.
    pub a: [f64; 2],
    /// End point `(x, y)`.
    pub b: [f64; 2],
}

/// A junction between two road entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadConnect {
    /// First road.
    pub a: EntityId,
    /// Second road.
    pub b: EntityId,
}

/// The value carried by a component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ComponentValue {
    /// Integer payload.
    Int(i64),
    /// Float payload.
    Float(f64),
    /// Entity reference payload.
    Id(EntityId),
    /// String payload, owned by the component.
    Str(String),
    /// Production payload.
    ItemRate(Box<ItemRate>),
    /// Sale price payload.
    ItemPrice(Box<ItemPrice>),
    /// Conversion payload.
    ConversionRate(Box<ConversionRate>),
    /// Road segment payload.
    RoadSpan(Box<RoadSpan>),
    /// Road junction payload.
    RoadConnect(Box<RoadConnect>),
    /// Elements of an array component.
    List(Vec<ComponentValue>),
}

impl ComponentValue {
    /// Returns the zero value for one element of `internal`.
    #[must_use]
    pub fn zero_of(internal: InternalType) -> Self {
        match internal {
            InternalType::Int => Self::Int(0),
            InternalType::Float => Self::Float(0.0),
            InternalType::Id => Self::Id(EntityId::NULL),
            InternalType::Str => Self::Str(String::new()),
            InternalType::ItemRate => Self::ItemRate(Box::default()),
            InternalType::ItemPrice => Self::ItemPrice(Box::default()),
            InternalType::ConversionRate => Self::ConversionRate(Box::default()),
            InternalType::RoadSpan => Self::RoadSpan(Box::default()),
            InternalType::RoadConnect => Self::RoadConnect(Box::default()),
        }
    }

    /// Returns the zero value for a component declared by `def`.
    #[must_use]
    pub fn zeroed(def: &CompDef) -> Self {
        if def.is_array {
            Self::List(Vec::new())
        } else {
            Self::zero_of(def.internal)
        }
    }

    /// Returns the internal type of a scalar value, `None` for lists.
    #[must_use]
    pub const fn internal_type(&self) -> Option<InternalType> {
        Some(match self {
            Self::Int(_) => InternalType::Int,
            Self::Float(_) => InternalType::Float,
            Self::Id(_) => InternalType::Id,
            Self::Str(_) => InternalType::Str,
            Self::ItemRate(_) => InternalType::ItemRate,
            Self::ItemPrice(_) => InternalType::ItemPrice,
            Self::ConversionRate(_) => InternalType::ConversionRate,
            Self::RoadSpan(_) => InternalType::RoadSpan,
            Self::RoadConnect(_) => InternalType::RoadConnect,
            Self::List(_) => return None,
        })
    }

    /// Checks whether this value may be stored in a component of `def`.
    #[must_use]
    pub fn fits(&self, def: &CompDef) -> bool {
        match self {
            Self::List(elements) => {
                def.is_array
                    && elements
                        .iter()
                        .all(|e| e.internal_type() == Some(def.internal))
            }
            scalar => !def.is_array && scalar.internal_type() == Some(def.internal),
        }
    }

    /// Describes the value's shape for error messages.
    #[must_use]
    pub fn shape(&self) -> String {
        match self {
            Self::List(elements) => match elements.first().and_then(Self::internal_type) {
                Some(internal) => format!("^{internal}"),
                None => "^".to_string(),
            },
            scalar => scalar
                .internal_type()
                .map_or_else(String::new, |t| t.name().to_string()),
        }
    }
}

impl From<i64> for ComponentValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ComponentValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<EntityId> for ComponentValue {
    fn from(value: EntityId) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for ComponentValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ComponentValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<ItemRate> for ComponentValue {
    fn from(value: ItemRate) -> Self {
        Self::ItemRate(Box::new(value))
    }
}

impl From<ItemPrice> for ComponentValue {
    fn from(value: ItemPrice) -> Self {
        Self::ItemPrice(Box::new(value))
    }
}

impl From<ConversionRate> for ComponentValue {
    fn from(value: ConversionRate) -> Self {
        Self::ConversionRate(Box::new(value))
    }
}

impl From<RoadSpan> for ComponentValue {
    fn from(value: RoadSpan) -> Self {
        Self::RoadSpan(Box::new(value))
    }
}

impl From<RoadConnect> for ComponentValue {
    fn from(value: RoadConnect) -> Self {
        Self::RoadConnect(Box::new(value))
    }
}

/// A typed value attached to one entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Declared component type.
    pub type_id: ComponentTypeId,
    /// Current value.
    pub value: ComponentValue,
}

impl Component {
    /// Integer value, if this is an int component.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            ComponentValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Float value, if this is a float component.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            ComponentValue::Float(d) => Some(d),
            _ => None,
        }
    }

    /// Entity reference, if this is an id component.
    #[must_use]
    pub fn as_id(&self) -> Option<EntityId> {
        match self.value {
            ComponentValue::Id(id) => Some(id),
            _ => None,
        }
    }

    /// String value, if this is a string component.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            ComponentValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Production payload.
    #[must_use]
    pub fn item_rate(&self) -> Option<&ItemRate> {
        match &self.value {
            ComponentValue::ItemRate(r) => Some(r),
            _ => None,
        }
    }

    /// Production payload for mutation.
    pub fn item_rate_mut(&mut self) -> Option<&mut ItemRate> {
        match &mut self.value {
            ComponentValue::ItemRate(r) => Some(r),
            _ => None,
        }
    }

    /// Sale price payload.
    #[must_use]
    pub fn item_price(&self) -> Option<&ItemPrice> {
        match &self.value {
            ComponentValue::ItemPrice(p) => Some(p),
            _ => None,
        }
    }

    /// Conversion payload.
    #[must_use]
    pub fn conversion_rate(&self) -> Option<&ConversionRate> {
        match &self.value {
            ComponentValue::ConversionRate(c) => Some(c),
            _ => None,
        }
    }

    /// Conversion payload for mutation.
    pub fn conversion_rate_mut(&mut self) -> Option<&mut ConversionRate> {
        match &mut self.value {
            ComponentValue::ConversionRate(c) => Some(c),
            _ => None,
        }
    }

    /// Road segment payload.
    #[must_use]
    pub fn road_span(&self) -> Option<&RoadSpan> {
        match &self.value {
            ComponentValue::RoadSpan(s) => Some(s),
            _ => None,
        }
    }

    /// Road junction payload.
    #[must_use]
    pub fn road_connect(&self) -> Option<&RoadConnect> {
        match &self.value {
            ComponentValue::RoadConnect(c) => Some(c),
            _ => None,
        }
    }

    /// Elements of an array component.
    #[must_use]
    pub fn elements(&self) -> Option<&[ComponentValue]> {
        match &self.value {
            ComponentValue::List(elements) => Some(elements),
            _ => None,
        }
    }
}
