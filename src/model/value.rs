//! Tagged property value type shared by entities and edges.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A physical quantity with its unit (e.g. `247.0 g`, `12.5 mm`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self { value, unit: unit.into() }
    }

    /// Grams shorthand — the dominant unit in weight-tracked inventory.
    pub fn grams(value: f64) -> Self {
        Self::new(value, "g")
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Closed value union for entity and edge properties.
///
/// Covers the scalar, temporal, collection, and domain types inventory
/// entities carry:
/// - Scalars: `Bool`, `Int` (i32), `Long` (i64), `Float` (f32),
///   `Double` (f64), `Text`, `Bytes`
/// - Containers: `List`, `Map`
/// - Temporal: `Date`, `DateTime`
/// - Domain: `Quantity`
///
/// The tag and payload always agree; `Bytes` equality is content-based.
/// Typed accessors return `None` on tag mismatch — there is no implicit
/// coercion between numeric widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<PropertyValue>),
    Map(HashMap<String, PropertyValue>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Quantity(Quantity),
}

// ============================================================================
// Type checking
// ============================================================================

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "NULL",
            PropertyValue::Bool(_) => "BOOLEAN",
            PropertyValue::Int(_) => "INT",
            PropertyValue::Long(_) => "LONG",
            PropertyValue::Float(_) => "FLOAT",
            PropertyValue::Double(_) => "DOUBLE",
            PropertyValue::Text(_) => "TEXT",
            PropertyValue::Bytes(_) => "BYTES",
            PropertyValue::List(_) => "LIST",
            PropertyValue::Map(_) => "MAP",
            PropertyValue::Date(_) => "DATE",
            PropertyValue::DateTime(_) => "DATETIME",
            PropertyValue::Quantity(_) => "QUANTITY",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PropertyValue::Int(_)
                | PropertyValue::Long(_)
                | PropertyValue::Float(_)
                | PropertyValue::Double(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropertyValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            PropertyValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            PropertyValue::Quantity(q) => Some(q),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls — the factory mapping native values to variants)
// ============================================================================

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self { PropertyValue::Bool(v) }
}
impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self { PropertyValue::Int(v) }
}
impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self { PropertyValue::Long(v) }
}
impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self { PropertyValue::Float(v) }
}
impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self { PropertyValue::Double(v) }
}
impl From<String> for PropertyValue {
    fn from(v: String) -> Self { PropertyValue::Text(v) }
}
impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self { PropertyValue::Text(v.to_owned()) }
}
impl From<Vec<u8>> for PropertyValue {
    fn from(v: Vec<u8>) -> Self { PropertyValue::Bytes(v) }
}
impl From<NaiveDate> for PropertyValue {
    fn from(v: NaiveDate) -> Self { PropertyValue::Date(v) }
}
impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self { PropertyValue::DateTime(v) }
}
impl From<Quantity> for PropertyValue {
    fn from(v: Quantity) -> Self { PropertyValue::Quantity(v) }
}
impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Long(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::Text(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            PropertyValue::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            PropertyValue::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            PropertyValue::Date(d) => write!(f, "{d}"),
            PropertyValue::DateTime(dt) => write!(f, "{dt}"),
            PropertyValue::Quantity(q) => write!(f, "{q}"),
        }
    }
}
