use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A storage-level scalar. Records are flat maps of these.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Primitive {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Primitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn mismatch(&self, expected: &str) -> String {
        format!("expected {expected}, found {}", self.kind())
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Timestamp(t) => f.write_str(&t.to_rfc3339()),
        }
    }
}

/// A value that can live in one record field.
///
/// Plain primitives copy straight through. Value objects convert through
/// their own representation and re-validate on the way back, so a corrupted
/// row surfaces as an error instead of an invalid domain value.
pub trait Field: Sized {
    fn to_primitive(&self) -> Primitive;

    /// Rebuild the value, or describe why the stored primitive is unusable.
    fn from_primitive(value: Primitive) -> Result<Self, String>;
}

impl Field for String {
    fn to_primitive(&self) -> Primitive {
        Primitive::Text(self.clone())
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        match value {
            Primitive::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl Field for i64 {
    fn to_primitive(&self) -> Primitive {
        Primitive::Integer(*self)
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        match value {
            Primitive::Integer(n) => Ok(n),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl Field for bool {
    fn to_primitive(&self) -> Primitive {
        Primitive::Boolean(*self)
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        match value {
            Primitive::Boolean(b) => Ok(b),
            other => Err(other.mismatch("boolean")),
        }
    }
}

impl Field for DateTime<Utc> {
    fn to_primitive(&self) -> Primitive {
        Primitive::Timestamp(*self)
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        match value {
            Primitive::Timestamp(t) => Ok(t),
            other => Err(other.mismatch("timestamp")),
        }
    }
}

impl<T: Field> Field for Option<T> {
    fn to_primitive(&self) -> Primitive {
        match self {
            Some(v) => v.to_primitive(),
            None => Primitive::Null,
        }
    }

    fn from_primitive(value: Primitive) -> Result<Self, String> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_primitive(value).map(Some)
    }
}
