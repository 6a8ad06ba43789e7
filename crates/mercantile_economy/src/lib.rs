//! # MERCANTILE Economy
//!
//! Production, conversion and trade on top of the `mercantile_core` data
//! model.
//!
//! ## Design Principles
//!
//! 1. **Config-driven** - component types, entity types, recipes and sinks
//!    all come from a JSON or TOML document
//! 2. **Whole batches** - a conversion runs completely or not at all
//! 3. **Escrow before sale** - stock offered on the market is set aside
//!    first, so it cannot also be converted
//! 4. **Silent clamps** - running short of stock or money is a normal
//!    outcome, never an error
//!
//! ## Threading
//!
//! A tick is single-threaded. [`SharedEconomy`] puts the whole economy
//! behind one lock when a UI thread needs to read it.
//!
//! ## Example
//!
//! ```rust
//! use mercantile_economy::Economy;
//!
//! let mut economy = Economy::from_toml_str(r#"
//!     component_defs = [
//!         { name = "name", type = "str" },
//!         { name = "produces", type = "itemRate" },
//!     ]
//!     entity_defs = [{ name = "Item" }, { name = "Mine" }]
//!
//!     [[entities]]
//!     type = "Item"
//!     id = "ore"
//!     comps = [["name", "Ore"]]
//!
//!     [[entities]]
//!     type = "Mine"
//!     id = "pit"
//!     comps = [["produces", ["ore", 2.0]]]
//! "#)?;
//!
//! for _ in 0..10 {
//!     economy.tick();
//! }
//!
//! let world = economy.world();
//! let pit = world.entities_of_type_name("Mine").next().map(|e| e.id);
//! assert_eq!(pit.map(|id| world.item_count_by_name(id, "Ore")), Some(5));
//! # Ok::<(), mercantile_economy::EconomyError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod conversion;
pub mod economy;
pub mod error;
pub mod market;
pub mod sync;

pub use config::{ConfigLoader, ConfigValue, LoadSummary};
pub use conversion::{Conversion, ConversionLine, ConversionTable};
pub use economy::{Economy, TickReport};
pub use error::{EconomyError, EconomyResult};
pub use market::{Fill, Market, MarketOrder, MarketSink, SinkId};
pub use sync::SharedEconomy;
