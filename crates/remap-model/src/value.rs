//! Field values.

use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

use crate::record::Record;

/// A single field value in a source or destination record.
///
/// Serializes untagged, so records round-trip as plain JSON objects.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or explicitly null.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Ordered sequence, e.g. the output of an array or nest rule.
    Array(Vec<Value>),
    /// Nested subrecord, e.g. one group produced by a nest rule.
    Record(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Display-style string coercion used by concatenate, interpolate,
    /// and nest. Null becomes the empty string; integral numbers render
    /// without a fractional part; arrays and subrecords render as JSON.
    pub fn coerce_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Record(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    /// Numeric coercion used by arithmetic equations. Numeric strings
    /// parse; booleans map to 1/0; everything else is `None`.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Null | Self::Array(_) | Self::Record(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

/// Hand-written so integral numbers serialize without a trailing `.0`:
/// a value parsed from `42` writes back as `42`, not `42.0`.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(values) => values.serialize(serializer),
            Self::Record(record) => record.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Array(values)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
