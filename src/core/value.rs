use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::{OrmError, Result};

/// Fixed textual representation for DATETIME columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A column value in its host representation.
///
/// Scalars map directly onto their column types; `DateTime` and `Json` are
/// converted to and from their textual column representations by the type
/// mapper on save/load.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::DateTime(_) => "DATETIME",
            Self::Json(_) => "JSON",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(*f as i64),
            Self::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Builds a `Json` value from any serializable host value.
    ///
    /// This is how collection- and struct-typed fields enter the mapper:
    /// the column side stores their JSON serialization as text.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| OrmError::Coercion(format!("JSON serialization failed: {}", e)))
    }

    /// Extracts a typed host value out of a `Json` (or JSON text) value.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Json(v) => serde_json::from_value(v.clone())
                .map_err(|e| OrmError::Coercion(format!("JSON deserialization failed: {}", e))),
            Self::Text(s) => serde_json::from_str(s)
                .map_err(|e| OrmError::Coercion(format!("JSON deserialization failed: {}", e))),
            other => Err(OrmError::Coercion(format!(
                "Cannot deserialize from {} value",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::DateTime(ts) => write!(f, "{}", ts.format(DATETIME_FORMAT)),
            Self::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}
