//! Atomic SQL values and conversions.
//!
//! [`Value`] is what travels between the builders and a
//! [`Connection`](crate::connection::Connection): bind parameters on the way in,
//! result slots on the way out.
//!
//! - [`ToValue`] turns Rust values into bind values. A type may declare its
//!   own placeholder token through [`ToValue::PLACEHOLDER`].
//! - [`FromValue`] turns hydrated values back into Rust field types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single SQL value.
#[derive(Clone)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Decoded JSON document (e.g. the result of `COLUMN_JSON`).
    Json(serde_json::Value),
    /// Element list for membership predicates (`IN (...)`).
    ///
    /// Never bound as a single parameter.
    List(Vec<Value>),
    /// Value constructed by an explicit target-class mapping rule.
    Object(Arc<dyn Any + Send + Sync>),
    /// Value that is bound through a custom placeholder token instead of `?`.
    Wrapped {
        placeholder: &'static str,
        value: Box<Value>,
    },
}

impl Value {
    /// Wrap a value so it binds through `placeholder` (e.g. `ST_GeomFromText(?)`).
    pub fn wrapped(placeholder: &'static str, value: impl Into<Value>) -> Self {
        Value::Wrapped {
            placeholder,
            value: Box::new(value.into()),
        }
    }

    /// Wrap an arbitrary object.
    pub fn object<T: Any + Send + Sync>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Loose truthiness: null, `false`, zero, empty text/bytes/list and
    /// empty JSON objects/arrays count as falsy. So does the text `"0"`.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::UInt(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty() || s == "0",
            Value::Bytes(b) => b.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Json(json) => match json {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(b) => !*b,
                serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
                serde_json::Value::String(s) => s.is_empty() || s == "0",
                serde_json::Value::Array(a) => a.is_empty(),
                serde_json::Value::Object(o) => o.is_empty(),
            },
            Value::Wrapped { value, .. } => value.is_falsy(),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) | Value::Object(_) => false,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Wrapped { .. } => "wrapped",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Value::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Value::Date(v) => f.debug_tuple("Date").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Value::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Object(_) => f.debug_tuple("Object").field(&"<dyn Any>").finish(),
            Value::Wrapped { placeholder, value } => f
                .debug_struct("Wrapped")
                .field("placeholder", placeholder)
                .field("value", value)
                .finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            (
                Value::Wrapped {
                    placeholder: pa,
                    value: va,
                },
                Value::Wrapped {
                    placeholder: pb,
                    value: vb,
                },
            ) => pa == pb && va == vb,
            _ => false,
        }
    }
}

/// Bind type tag, one character per bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// `i`: integers and booleans
    Integer,
    /// `d`: numbers
    Double,
    /// `s`: strings and everything else
    String,
}

impl TypeTag {
    pub fn as_char(self) -> char {
        match self {
            TypeTag::Integer => 'i',
            TypeTag::Double => 'd',
            TypeTag::String => 's',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(TypeTag::Integer),
            'd' => Some(TypeTag::Double),
            's' => Some(TypeTag::String),
            _ => None,
        }
    }
}

// ==================== ToValue ====================

/// Conversion of Rust values into bind values.
///
/// Implement this for domain types that bind through a SQL function:
///
/// ```
/// use mdborm::{ToValue, Value};
///
/// struct Point(f64, f64);
///
/// impl ToValue for Point {
///     const PLACEHOLDER: &'static str = "ST_GeomFromText(?)";
///
///     fn to_value(&self) -> Value {
///         Value::Text(format!("POINT({} {})", self.0, self.1))
///     }
/// }
///
/// let param = Point(1.0, 2.0).to_param();
/// assert!(matches!(param, Value::Wrapped { placeholder: "ST_GeomFromText(?)", .. }));
/// ```
pub trait ToValue {
    /// Placeholder token emitted for values of this type.
    const PLACEHOLDER: &'static str = "?";

    /// The plain value.
    fn to_value(&self) -> Value;

    /// The value as it should be bound, carrying [`Self::PLACEHOLDER`] when it is not `?`.
    fn to_param(&self) -> Value {
        let value = self.to_value();
        if Self::PLACEHOLDER == "?" {
            value
        } else {
            Value::Wrapped {
                placeholder: Self::PLACEHOLDER,
                value: Box::new(value),
            }
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    const PLACEHOLDER: &'static str = T::PLACEHOLDER;

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn to_param(&self) -> Value {
        (**self).to_param()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const PLACEHOLDER: &'static str = T::PLACEHOLDER;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn to_param(&self) -> Value {
        match self {
            Some(v) => v.to_param(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_param).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

macro_rules! to_value_via {
    ($variant:ident as $target:ty => $($t:ty),+ $(,)?) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::$variant(*self as $target)
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )+
    };
}

to_value_via!(Int as i64 => i8, i16, i32, i64, isize);
to_value_via!(UInt as u64 => u8, u16, u32, u64, usize);
to_value_via!(Float as f64 => f32, f64);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl ToValue for NaiveTime {
    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(feature = "uuid")]
impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }
}

#[cfg(feature = "rust_decimal")]
impl ToValue for rust_decimal::Decimal {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

// ==================== FromValue ====================

/// Conversion failure from [`Value`] to a Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {found} value into {expected}")]
pub struct ValueError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ValueError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// Conversion of hydrated values into Rust field types.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::UInt(u) => Ok(u != 0),
            Value::Text(ref s) if s == "0" || s == "1" => Ok(s == "1"),
            other => Err(ValueError::new("bool", &other)),
        }
    }
}

macro_rules! from_value_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let err = || ValueError::new(stringify!($t), &value);
                    match &value {
                        Value::Int(i) => <$t>::try_from(*i).map_err(|_| err()),
                        Value::UInt(u) => <$t>::try_from(*u).map_err(|_| err()),
                        Value::Bool(b) => Ok(<$t>::from(*b)),
                        Value::Text(s) => s.trim().parse::<$t>().map_err(|_| err()),
                        _ => Err(err()),
                    }
                }
            }
        )+
    };
}

from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! from_value_float {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match &value {
                        Value::Float(f) => Ok(*f as $t),
                        Value::Int(i) => Ok(*i as $t),
                        Value::UInt(u) => Ok(*u as $t),
                        Value::Text(s) => s
                            .trim()
                            .parse::<$t>()
                            .map_err(|_| ValueError::new(stringify!($t), &value)),
                        _ => Err(ValueError::new(stringify!($t), &value)),
                    }
                }
            }
        )+
    };
}

from_value_float!(f32, f64);

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => {
                String::from_utf8(b).map_err(|_| ValueError {
                    expected: "String",
                    found: "non-utf8 bytes",
                })
            }
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
            Value::Time(t) => Ok(t.format(TIME_FORMAT).to_string()),
            Value::DateTime(dt) => Ok(dt.format(DATETIME_FORMAT).to_string()),
            Value::Json(json) => Ok(json.to_string()),
            other => Err(ValueError::new("String", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ValueError::new("Vec<u8>", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|_| ValueError::new("NaiveDate", &value)),
            _ => Err(ValueError::new("NaiveDate", &value)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::Time(t) => Ok(*t),
            Value::Text(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .map_err(|_| ValueError::new("NaiveTime", &value)),
            _ => Err(ValueError::new("NaiveTime", &value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|_| ValueError::new("NaiveDateTime", &value)),
            _ => Err(ValueError::new("NaiveDateTime", &value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::Json(json) => Ok(json.clone()),
            Value::Text(s) => {
                serde_json::from_str(s).map_err(|_| ValueError::new("serde_json::Value", &value))
            }
            _ => Err(ValueError::new("serde_json::Value", &value)),
        }
    }
}

impl FromValue for serde_json::Map<String, serde_json::Value> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let found = value.type_name();
        match serde_json::Value::from_value(value)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(ValueError {
                expected: "JSON object",
                found,
            }),
        }
    }
}

/// Flattens a JSON object into text values, e.g. translations keyed by language.
impl FromValue for BTreeMap<String, String> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let map = serde_json::Map::<String, serde_json::Value>::from_value(value)?;
        Ok(map
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect())
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Object(object) => object.downcast::<T>().map_err(|_| ValueError {
                expected: std::any::type_name::<T>(),
                found: "object of another type",
            }),
            other => Err(ValueError::new(std::any::type_name::<T>(), &other)),
        }
    }
}

#[cfg(feature = "uuid")]
impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::Text(s) => s.parse().map_err(|_| ValueError::new("Uuid", &value)),
            Value::Bytes(b) => uuid::Uuid::from_slice(b).map_err(|_| ValueError::new("Uuid", &value)),
            _ => Err(ValueError::new("Uuid", &value)),
        }
    }
}

#[cfg(feature = "rust_decimal")]
impl FromValue for rust_decimal::Decimal {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match &value {
            Value::Text(s) => s.parse().map_err(|_| ValueError::new("Decimal", &value)),
            Value::Int(i) => Ok(rust_decimal::Decimal::from(*i)),
            Value::UInt(u) => Ok(rust_decimal::Decimal::from(*u)),
            _ => Err(ValueError::new("Decimal", &value)),
        }
    }
}
