//! # Economy Error Types
//!
//! All errors that can occur while loading or running the economy. Loading
//! errors are fatal for the document being loaded; the tick loop itself
//! never fails.

use mercantile_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the economy system.
#[derive(Error, Debug)]
pub enum EconomyError {
    /// The document root is not an object.
    #[error("invalid config format: root must be an object")]
    MalformedRoot,

    /// A top-level section has the wrong shape.
    #[error("invalid {section} format: expected {expected}")]
    InvalidSection {
        /// Section key, e.g. `component_defs`.
        section: &'static str,
        /// The shape that was expected.
        expected: &'static str,
    },

    /// A component definition names an unknown or empty internal type.
    #[error("invalid component internal type '{type_name}' for component '{component}'")]
    InvalidComponentType {
        /// Component being declared.
        component: String,
        /// The offending type string.
        type_name: String,
    },

    /// An entity names a type that was never declared.
    #[error("failed to create entity of unknown type '{0}'")]
    UnknownEntityType(String),

    /// A component name is not declared in `component_defs`.
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    /// A value has the wrong shape for its field.
    #[error("invalid value for {context}: {reason}")]
    InvalidValue {
        /// What was being parsed.
        context: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A conversion recipe is malformed.
    #[error("conversion '{name}' is invalid: {reason}")]
    InvalidConversion {
        /// Conversion name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The data model rejected an operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The JSON document could not be parsed.
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The TOML document could not be parsed.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EconomyError {
    /// Builds an `InvalidValue` error.
    pub(crate) fn invalid_value(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Builds an `InvalidConversion` error.
    pub(crate) fn invalid_conversion(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConversion {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
