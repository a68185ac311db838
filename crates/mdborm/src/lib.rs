//! # mdborm
//!
//! A lightweight MariaDB statement builder with row hydration.
//!
//! ## Features
//!
//! - **SQL explicit**: builders produce the exact SQL string they will run
//! - **Bound values**: every value is a positional `?` parameter with a
//!   MariaDB type tag (`i`, `d`, `s`)
//! - **Dynamic columns**: `COLUMN_CREATE`/`COLUMN_GET`/`COLUMN_JSON` helpers
//! - **Hydration**: result rows are written into any [`Hydrate`] target,
//!   including composite sub-objects; derive it with `#[derive(Hydrate)]`
//! - **Safe defaults**: DELETE requires WHERE, UPDATE requires SET
//! - **Monitoring**: hooks and monitors around any [`Connection`]
//!
//! ## Example
//!
//! ```
//! use mdborm::memory::{MemoryConnection, ResultSet};
//! use mdborm::{ColumnType, FieldOptions, Row, SqlBuilder, Value, insert_into, select_from};
//!
//! let mut conn = MemoryConnection::new();
//!
//! // INSERT
//! conn.push_write(42, 1);
//! let id = insert_into("movies")
//!     .set("title", "Alien")
//!     .set_dynamic("titles", [("fr", "Le huitième passager")])
//!     .execute(&mut conn)
//!     .unwrap();
//! assert_eq!(id, 42);
//!
//! // SELECT
//! conn.push_result(
//!     ResultSet::new()
//!         .column("id", ColumnType::LongLong, 20)
//!         .column("release_year", ColumnType::Short, 6)
//!         .row(vec![Value::Int(42), Value::Int(1979)]),
//! );
//! let mut q = select_from("movies");
//! q.select("id")
//!     .select_with("release_year", FieldOptions::new().property("year"))
//!     .and_where("id", id);
//! assert_eq!(
//!     q.build_sql(),
//!     "SELECT `id`, `release_year` FROM `movies` WHERE `id` = ?"
//! );
//!
//! let movie: Row = q.fetch_object(&mut conn, &[]).unwrap();
//! assert_eq!(movie.try_get::<i32>("year").unwrap(), 1979);
//! ```

extern crate self as mdborm;

pub mod builder;
pub mod condition;
pub mod connection;
pub mod dynamic;
pub mod error;
pub mod field;
pub mod ident;
pub mod memory;
pub mod monitor;
pub mod param;
pub mod prelude;
pub mod row;
pub mod value;

pub use builder::{
    DeleteBuilder, InsertBuilder, JoinKind, MAX_ROWS, MutationBuilder, OrderDirection,
    SelectBuilder, SqlBuilder, UpdateBuilder, WriteOutcome, delete_from, insert_into, select_from,
    update,
};
pub use condition::{ConditionBuilder, Conjunction};
pub use connection::{ColumnMeta, ColumnType, Connection, Statement};
pub use error::{DriverError, OrmError, OrmResult};
pub use field::{Composite, FieldDescriptor, FieldOptions, MapRule, Property};
pub use monitor::{
    CompositeHook, CompositeMonitor, HookAction, InstrumentedConnection, LoggingMonitor,
    MonitorConfig, NoopMonitor, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryStats,
    QueryType, StatsMonitor, TracingSqlHook,
};
pub use param::Params;
pub use row::{AnyHydrate, Hydrate, Row};
pub use value::{FromValue, ToValue, TypeTag, Value, ValueError};

#[cfg(feature = "derive")]
pub use mdborm_derive::Hydrate;
