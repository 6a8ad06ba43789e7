//! # Configuration
//!
//! Economy documents are read through the [`ConfigValue`] trait, so the
//! loader does not depend on a particular parser. JSON and TOML adapters
//! are provided.

mod loader;
mod value;

pub use loader::{ConfigLoader, LoadSummary};
pub use value::ConfigValue;
