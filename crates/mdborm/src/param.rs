//! Bind parameter list shared by every statement builder.
//!
//! [`Params`] keeps the type-tag string and the value list side by side. Every
//! mutation appends to both, so `types().len() == values().len()` holds at all
//! times and both follow placeholder emission order.

use crate::value::{DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT, ToValue, TypeTag, Value};

/// Ordered `(type-tag, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    types: String,
    values: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `value`, append it and return the placeholder token to embed.
    ///
    /// - `Bool` binds as `i` (stored as `0`/`1`).
    /// - `Int`, `UInt` and `Float` bind as `d`.
    /// - Everything else binds as `s` in its text form; `Null` stays `Null`.
    /// - `Wrapped` binds its inner value and returns its own placeholder.
    ///
    /// # Panics
    ///
    /// On `List` and `Object` values. A list has to be expanded by the caller
    /// into one `bind` per element.
    pub fn bind(&mut self, value: Value) -> &'static str {
        let (placeholder, value) = match value {
            Value::Wrapped { placeholder, value } => (placeholder, *value),
            other => ("?", other),
        };
        let (tag, value) = classify(value);
        self.types.push(tag.as_char());
        self.values.push(value);
        placeholder
    }

    /// Bind anything convertible through [`ToValue`], honoring its placeholder.
    pub fn bind_param<T: ToValue + ?Sized>(&mut self, value: &T) -> &'static str {
        self.bind(value.to_param())
    }

    /// Append caller-classified pairs verbatim.
    ///
    /// # Panics
    ///
    /// When the tag count differs from the value count or a tag is not one of
    /// `i`, `d`, `s`.
    pub fn push_raw(&mut self, types: &str, values: Vec<Value>) {
        assert_eq!(
            types.chars().count(),
            values.len(),
            "type tags {types:?} do not match {} values",
            values.len()
        );
        assert!(
            types.chars().all(|c| TypeTag::from_char(c).is_some()),
            "invalid type tag in {types:?}, expected only 'i', 'd' or 's'"
        );
        self.types.push_str(types);
        self.values.extend(values);
    }

    /// Append another list after this one.
    pub fn extend(&mut self, other: &Params) {
        self.types.push_str(&other.types);
        self.values.extend(other.values.iter().cloned());
    }

    /// Concatenate two lists into a new one, leaving both untouched.
    pub fn merged(&self, other: &Params) -> Params {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    pub fn types(&self) -> &str {
        &self.types
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.values.clear();
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.types, self.values)
    }
}

fn classify(value: Value) -> (TypeTag, Value) {
    match value {
        Value::Bool(b) => (TypeTag::Integer, Value::Int(i64::from(b))),
        v @ (Value::Int(_) | Value::UInt(_) | Value::Float(_)) => (TypeTag::Double, v),
        v @ (Value::Null | Value::Text(_) | Value::Bytes(_)) => (TypeTag::String, v),
        Value::Date(d) => (
            TypeTag::String,
            Value::Text(d.format(DATE_FORMAT).to_string()),
        ),
        Value::Time(t) => (
            TypeTag::String,
            Value::Text(t.format(TIME_FORMAT).to_string()),
        ),
        Value::DateTime(dt) => (
            TypeTag::String,
            Value::Text(dt.format(DATETIME_FORMAT).to_string()),
        ),
        Value::Json(json) => (TypeTag::String, Value::Text(json.to_string())),
        Value::Wrapped { value, .. } => classify(*value),
        Value::List(items) => panic!(
            "cannot bind a list of {} values as one parameter; bind each element separately",
            items.len()
        ),
        Value::Object(_) => panic!("cannot bind an object value as a parameter"),
    }
}
