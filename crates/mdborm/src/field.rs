//! SELECT field descriptors and per-field mapping options.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::connection::{ColumnMeta, ColumnType};
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_field;
use crate::param::Params;
use crate::row::{AnyHydrate, Hydrate};
use crate::value::{DATE_FORMAT, FromValue, Value};

/// Transform applied to a raw, non-null column value.
pub type Callback = Arc<dyn Fn(Value) -> OrmResult<Value> + Send + Sync>;

/// Where a hydrated value is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// A property of the target itself.
    Field(String),
    /// A property of one of the target's composites.
    Composite { composite: String, property: String },
}

impl Property {
    pub fn field(name: impl Into<String>) -> Self {
        Property::Field(name.into())
    }

    pub fn composite(composite: impl Into<String>, property: impl Into<String>) -> Self {
        Property::Composite {
            composite: composite.into(),
            property: property.into(),
        }
    }

    /// The name of the property the value lands in.
    pub fn name(&self) -> &str {
        match self {
            Property::Field(name) => name,
            Property::Composite { property, .. } => property,
        }
    }
}

/// Explicit value mapping of a field, tried before automatic coercion.
#[derive(Clone)]
pub enum MapRule {
    /// Construct a value of a target type from the raw value.
    Class {
        type_name: &'static str,
        construct: Callback,
    },
    /// Arbitrary transform.
    Callback(Callback),
}

impl MapRule {
    /// Rule constructing `C` from the raw value and wrapping it as [`Value::Object`].
    pub fn class<C>() -> Self
    where
        C: TryFrom<Value> + Any + Send + Sync,
        C::Error: fmt::Display,
    {
        let type_name = std::any::type_name::<C>();
        MapRule::Class {
            type_name,
            construct: Arc::new(move |raw| {
                C::try_from(raw)
                    .map(Value::object)
                    .map_err(|e| OrmError::decode("", format!("cannot construct {type_name}: {e}")))
            }),
        }
    }

    fn apply(&self, value: Value) -> OrmResult<Value> {
        match self {
            MapRule::Class { construct, .. } => construct(value),
            MapRule::Callback(callback) => callback(value),
        }
    }

    /// Classes are applied before callbacks.
    fn priority(&self) -> u8 {
        match self {
            MapRule::Class { .. } => 0,
            MapRule::Callback(_) => 1,
        }
    }
}

impl fmt::Debug for MapRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapRule::Class { type_name, .. } => f.debug_tuple("Class").field(type_name).finish(),
            MapRule::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// Per-field options for the `select*` methods.
///
/// ```
/// use mdborm::{FieldOptions, Value};
///
/// let opts = FieldOptions::new()
///     .composite("rating", "average")
///     .callback(|v| Ok(v));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub(crate) property: Option<Property>,
    pub(crate) alias: Option<String>,
    pub(crate) rules: Vec<MapRule>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the value into `name` instead of the default property.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.property = Some(Property::field(name));
        self
    }

    /// Write the value into `property` of the composite registered as `composite`.
    pub fn composite(mut self, composite: impl Into<String>, property: impl Into<String>) -> Self {
        self.property = Some(Property::composite(composite, property));
        self
    }

    /// Column alias in the projection (`expr AS `alias``).
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Construct a `C` from the raw value.
    pub fn class<C>(mut self) -> Self
    where
        C: TryFrom<Value> + Any + Send + Sync,
        C::Error: fmt::Display,
    {
        self.rules.push(MapRule::class::<C>());
        self
    }

    /// Transform the raw value. Returning [`Value::Null`] leaves the property unset.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Value) -> OrmResult<Value> + Send + Sync + 'static,
    {
        self.rules.push(MapRule::Callback(Arc::new(callback)));
        self
    }
}

/// One entry of a SELECT projection.
///
/// Descriptors are kept in projection order, which is also the order of the
/// result columns. Each one owns the params bound by its expression.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) expression: String,
    pub(crate) alias: Option<String>,
    pub(crate) property: Property,
    pub(crate) rules: Vec<MapRule>,
    pub(crate) params: Params,
}

impl FieldDescriptor {
    pub(crate) fn new(
        name: &str,
        expression: String,
        default_alias: Option<String>,
        default_property: String,
        options: FieldOptions,
        params: Params,
    ) -> Self {
        let mut rules = options.rules;
        rules.sort_by_key(MapRule::priority);
        Self {
            name: name.to_string(),
            expression,
            alias: options.alias.or(default_alias),
            property: options
                .property
                .unwrap_or(Property::Field(default_property)),
            rules,
            params,
        }
    }

    /// Logical field name given to `select*`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn property(&self) -> &Property {
        &self.property
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// `expression` or `expression AS `alias``
    pub fn projection(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expression, quote_field(alias)),
            None => self.expression.clone(),
        }
    }

    /// Map a non-null raw value: explicit rule first, then `TINYINT(1)` to
    /// bool, then temporal text to chrono values, else the raw value.
    pub(crate) fn map_value(&self, value: Value, meta: Option<&ColumnMeta>) -> OrmResult<Value> {
        if let Some(rule) = self.rules.first() {
            return rule
                .apply(value)
                .map_err(|e| with_column(e, &self.name));
        }

        let Some(meta) = meta else {
            return Ok(value);
        };
        if meta.is_boolean() {
            return bool::from_value(value)
                .map(Value::Bool)
                .map_err(|e| OrmError::decode(&self.name, e.to_string()));
        }
        if meta.column_type.is_temporal() {
            return parse_temporal(value, meta.column_type)
                .map_err(|message| OrmError::decode(&self.name, message));
        }
        Ok(value)
    }
}

fn with_column(err: OrmError, column: &str) -> OrmError {
    match err {
        OrmError::Decode { column: c, message } if c.is_empty() => OrmError::decode(column, message),
        other => other,
    }
}

fn parse_temporal(value: Value, column_type: ColumnType) -> Result<Value, String> {
    let text = match &value {
        Value::Text(s) => s.as_str(),
        Value::Bytes(b) => std::str::from_utf8(b).map_err(|e| e.to_string())?,
        _ => return Ok(value),
    };
    let parsed = match column_type {
        ColumnType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT).map(Value::Date),
        ColumnType::Time => NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map(Value::Time),
        _ => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map(Value::DateTime),
    };
    parsed.map_err(|e| format!("invalid {column_type:?} value {text:?}: {e}"))
}

/// Creates an empty sub-object for a composite property.
pub type CompositeFactory = Arc<dyn Fn() -> Box<dyn AnyHydrate> + Send + Sync>;

/// A sub-object assembled from part of the projection, once per row.
#[derive(Clone)]
pub struct Composite {
    pub(crate) property: String,
    pub(crate) factory: CompositeFactory,
    pub(crate) args: Vec<Value>,
}

impl Composite {
    pub fn new<C, F>(property: impl Into<String>, factory: F, args: Vec<Value>) -> Self
    where
        C: Hydrate + Any,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            property: property.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn AnyHydrate>),
            args,
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("property", &self.property)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
