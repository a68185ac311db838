//! Derive macros for mdborm
//!
//! Provides `#[derive(Hydrate)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod common;
mod hydrate;

/// Derive the `Hydrate` trait for a struct with named fields.
///
/// Every field is a property named after the field in lower camel case
/// (`release_year` → `releaseYear`) and converted with `FromValue`.
/// Properties not declared on the struct are decode errors.
///
/// # Example
///
/// ```ignore
/// use mdborm::{Hydrate, OrmResult, Value};
///
/// #[derive(Default, Hydrate)]
/// struct Rating {
///     average: f64,
///     votes: u32,
/// }
///
/// #[derive(Default, Hydrate)]
/// #[orm(finalize = "after_fetch")]
/// struct Movie {
///     id: i64,
///     #[orm(property = "title")]
///     display_title: String,
///     release_year: Option<i32>,
///     #[orm(composite)]
///     rating: Option<Rating>,
///     #[orm(skip)]
///     label: String,
/// }
///
/// impl Movie {
///     fn after_fetch(&mut self, _args: &[Value]) -> OrmResult<()> {
///         self.label = format!("{} ({})", self.display_title, self.id);
///         Ok(())
///     }
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(property = "name")]` - Map the field to a different property name
/// - `#[orm(composite)]` - Receive a composite sub-object (`T` or `Option<T>`)
/// - `#[orm(skip)]` - Never written by hydration
/// - `#[orm(finalize = "method")]` (on the struct) - Call
///   `self.method(args)` once per row after all properties are set
#[proc_macro_derive(Hydrate, attributes(orm))]
pub fn derive_hydrate(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    hydrate::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
