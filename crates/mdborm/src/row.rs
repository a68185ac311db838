//! Row hydration: the [`Hydrate`] trait, the generic [`Row`] target and the
//! per-row mapping step of the SELECT fetch pipeline.

use std::any::Any;

use crate::connection::ColumnMeta;
use crate::error::{OrmError, OrmResult};
use crate::field::{Composite, FieldDescriptor, Property};
use crate::value::{FromValue, Value};

/// A type result rows can be written into, property by property.
///
/// This trait should typically be derived using `#[derive(Hydrate)]`
/// from the `mdborm-derive` crate.
///
/// # Example
///
/// ```ignore
/// use mdborm::Hydrate;
///
/// #[derive(Default, Hydrate)]
/// struct Movie {
///     id: i64,
///     title: String,
///     release_year: Option<i32>,
/// }
/// ```
pub trait Hydrate {
    /// Write one mapped, non-null value.
    fn set_property(&mut self, name: &str, value: Value) -> OrmResult<()>;

    /// Install a finalized composite sub-object.
    fn set_composite(&mut self, name: &str, composite: Box<dyn Any>) -> OrmResult<()> {
        let _ = composite;
        Err(OrmError::decode(name, "no composite property with this name"))
    }

    /// Called once per row after every property and composite has been set.
    fn finalize(&mut self, args: &[Value]) -> OrmResult<()> {
        let _ = args;
        Ok(())
    }
}

/// [`Hydrate`] object that can be handed over as `Box<dyn Any>`.
pub trait AnyHydrate: Hydrate + Any {
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Hydrate + Any> AnyHydrate for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Generic hydration target: properties in projection order.
///
/// Null columns are absent from a row. Composites of a `Row` target must be
/// `Row`s themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
    composites: Vec<(String, Row)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Typed access. A missing property converts from `Null`, so
    /// `Option<T>` yields `None` for it.
    pub fn try_get<T: FromValue>(&self, name: &str) -> OrmResult<T> {
        let value = self.get(name).cloned().unwrap_or(Value::Null);
        T::from_value(value).map_err(|e| OrmError::decode(name, e.to_string()))
    }

    pub fn composite(&self, name: &str) -> Option<&Row> {
        self.composites
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, row)| row)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.composites.is_empty()
    }
}

impl Hydrate for Row {
    fn set_property(&mut self, name: &str, value: Value) -> OrmResult<()> {
        match self.values.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn set_composite(&mut self, name: &str, composite: Box<dyn Any>) -> OrmResult<()> {
        let row = composite
            .downcast::<Row>()
            .map_err(|_| OrmError::decode(name, "composites of a Row target must be Row"))?;
        self.composites.retain(|(key, _)| key != name);
        self.composites.push((name.to_string(), *row));
        Ok(())
    }
}

/// Write one fetched row into `target`.
///
/// `slots` holds one raw value per descriptor; they are taken out, leaving
/// `Null` behind. Composites are created fresh from their factories,
/// populated, finalized with their own args and installed before the target
/// is finalized with `args`.
pub(crate) fn hydrate_row<T: Hydrate + ?Sized>(
    target: &mut T,
    descriptors: &[FieldDescriptor],
    metadata: &[ColumnMeta],
    composites: &[Composite],
    slots: &mut [Value],
    args: &[Value],
) -> OrmResult<()> {
    let mut parts: Vec<_> = composites.iter().map(|c| (c.factory)()).collect();

    for (index, descriptor) in descriptors.iter().enumerate() {
        let raw = std::mem::replace(&mut slots[index], Value::Null);
        if raw.is_null() {
            continue;
        }
        let value = descriptor.map_value(raw, metadata.get(index))?;
        if value.is_null() {
            continue;
        }

        match &descriptor.property {
            Property::Field(name) => target.set_property(name, value)?,
            Property::Composite {
                composite,
                property,
            } => {
                let position = composites
                    .iter()
                    .position(|c| &c.property == composite)
                    .ok_or_else(|| {
                        OrmError::validation(format!(
                            "field `{}` targets unregistered composite `{composite}`",
                            descriptor.name
                        ))
                    })?;
                parts[position].set_property(property, value)?;
            }
        }
    }

    for (composite, mut part) in composites.iter().zip(parts) {
        part.finalize(&composite.args)?;
        target.set_composite(&composite.property, part.into_any())?;
    }

    target.finalize(args)
}
