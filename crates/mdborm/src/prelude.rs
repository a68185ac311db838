//! Convenient imports for typical `mdborm` usage.
//!
//! This module is intentionally small and focused on the most common APIs so
//! callers can start with:
//!
//! ```ignore
//! use mdborm::prelude::*;
//! ```

pub use crate::{
    Connection, FieldOptions, FromValue, Hydrate, MutationBuilder, OrmError, OrmResult, Row,
    SqlBuilder, ToValue, Value, delete_from, insert_into, select_from, update,
};

pub use crate::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
