//! Property values and their query-literal rendering.
//!
//! [`RawValue`] is what callers hand in: every dynamic type a traversal
//! host may produce, including the ones the store cannot compare. [`Value`]
//! is the narrower set that can be rendered as a query literal and compared
//! with the traversal's equality rules. [`Value::of`] is the only way across.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::support::Support;

/// Largest integer a double holds exactly, `2^53 - 1`.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// A property value the store can compare and the query language can denote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed map of values.
    Map(BTreeMap<String, Value>),
}

/// A loosely-typed input value, as produced by the traversal host.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Arbitrary-precision integer in decimal text form.
    BigInteger(String),
    /// Arbitrary-precision decimal in text form.
    BigDecimal(String),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Uuid([u8; 16]),
    String(String),
    List(Vec<RawValue>),
    /// Map entries in insertion order; keys may be of any type.
    Map(Vec<(RawValue, RawValue)>),
}

impl Value {
    /// Classify a raw input value.
    ///
    /// Fails with [`ValueError::UnsupportedType`] for types the store has no
    /// comparable counterpart for, and for maps with non-string keys.
    pub fn of(raw: RawValue) -> Result<Value, ValueError> {
        match raw {
            RawValue::Null => Ok(Value::Null),
            RawValue::Bool(b) => Ok(Value::Bool(b)),
            RawValue::Int(i) => Ok(Value::Int32(i)),
            RawValue::Long(i) => Ok(Value::Int64(i)),
            RawValue::Double(d) if d.is_finite() => Ok(Value::Double(d)),
            RawValue::Double(d) => Err(ValueError::unsupported(d, "non-finite double")),
            RawValue::String(s) => Ok(Value::String(s)),
            RawValue::List(items) => items
                .into_iter()
                .map(Value::of)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            RawValue::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match key {
                        RawValue::String(s) => s,
                        other => return Err(ValueError::unsupported(other, "map key")),
                    };
                    map.insert(key, Value::of(value)?);
                }
                Ok(Value::Map(map))
            }
            RawValue::Byte(b) => Err(ValueError::unsupported(b, "byte")),
            RawValue::Short(s) => Err(ValueError::unsupported(s, "short")),
            RawValue::Float(f) => Err(ValueError::unsupported(f, "float")),
            RawValue::BigInteger(s) => Err(ValueError::unsupported(s, "big integer")),
            RawValue::BigDecimal(s) => Err(ValueError::unsupported(s, "big decimal")),
            RawValue::Date(ms) => Err(ValueError::unsupported(ms, "date")),
            RawValue::Uuid(u) => Err(ValueError::unsupported(u, "uuid")),
        }
    }

    /// Convert a decoded JSON value.
    ///
    /// Integers that fit in 32 bits become `Int32`, other integers `Int64`,
    /// everything else numeric becomes `Double`.
    pub fn from_json(json: &serde_json::Value) -> Result<Value, ValueError> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Int32(small),
                        Err(_) => Value::Int64(i),
                    }
                } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                    Value::Double(f)
                } else {
                    return Err(ValueError::UnrepresentableNumber(n.to_string()));
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            serde_json::Value::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), Value::from_json(value)?);
                }
                Value::Map(map)
            }
        })
    }

    /// Convert to a JSON value, e.g. for bind variables and documents.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int32(i) => serde_json::Value::from(*i),
            Value::Int64(i) => serde_json::Value::from(*i),
            Value::Double(d) => serde_json::Value::from(*d),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Render as a query-language literal.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Double(d) => serde_json::Value::from(*d).to_string(),
            Value::String(s) => quote(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), v.render()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// Exactness of a comparison against this value.
    ///
    /// Null compares differently in the store than in the traversal host, so
    /// any null, including one nested in a composite, yields `Partial`. The
    /// store compares numbers as doubles, so an `Int64` outside the exactly
    /// representable range is `Partial` as well.
    pub fn support(&self) -> Support {
        match self {
            Value::Null => Support::Partial,
            Value::Int64(i) if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(i) => {
                Support::Partial
            }
            Value::List(items) => Support::join_all(items.iter().map(Value::support)),
            Value::Map(map) => Support::join_all(map.values().map(Value::support)),
            _ => Support::Full,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is numeric.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int32(_) | Value::Int64(_) | Value::Double(_))
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64 (widening from i32).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64 (converting from any numeric type).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a string with JSON escaping, which the query language shares.
pub fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<i32> for RawValue {
    fn from(v: i32) -> Self {
        RawValue::Int(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Long(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Double(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::String(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::String(v)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        RawValue::List(v.into_iter().map(Into::into).collect())
    }
}
