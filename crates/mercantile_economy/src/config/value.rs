//! # Config Value Trees
//!
//! The loader reads documents through [`ConfigValue`], a small read-only
//! view over a parsed value tree. JSON (`serde_json::Value`) and TOML
//! (`toml::Value`) both implement it, so either format feeds the same
//! loader.

/// Read-only access to a parsed configuration document.
///
/// Numbers are lenient: an integer read as a float widens, and a float read
/// as an integer truncates toward zero.
pub trait ConfigValue: Sized {
    /// Looks up `key` if this value is an object.
    fn get_key(&self, key: &str) -> Option<&Self>;

    /// Returns the elements if this value is an array.
    fn elements(&self) -> Option<&[Self]>;

    /// Returns the string if this value is a string.
    fn as_text(&self) -> Option<&str>;

    /// Returns the value as an integer if it is a number.
    fn as_int(&self) -> Option<i64>;

    /// Returns the value as a float if it is a number.
    fn as_float(&self) -> Option<f64>;

    /// Whether this value is an object (a table, in TOML).
    fn is_object(&self) -> bool;

    /// Looks up a string field of an object.
    fn get_text(&self, key: &str) -> Option<&str> {
        self.get_key(key).and_then(Self::as_text)
    }

    /// Looks up an integer field of an object, falling back to `default`
    /// when it is missing or not a number.
    fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_key(key).and_then(Self::as_int).unwrap_or(default)
    }
}

impl ConfigValue for serde_json::Value {
    fn get_key(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    fn elements(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}

impl ConfigValue for toml::Value {
    fn get_key(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Table(table) => table.get(key),
            _ => None,
        }
    }

    fn elements(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn is_object(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}
