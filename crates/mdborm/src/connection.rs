//! Connection and statement collaborator traits.
//!
//! The builders never talk to a server directly. They prepare one statement per
//! `execute`/`fetch` call on a [`Connection`], bind their params, run it and
//! read result rows into a slot buffer. Any MariaDB/MySQL driver with prepared
//! statement support can sit behind these traits;
//! [`MemoryConnection`](crate::memory::MemoryConnection) is a scripted one.
//!
//! Errors reported by implementations should be wrapped with
//! [`OrmError::driver`](crate::OrmError::driver). Builders pass them through
//! untouched.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Server-side column type as reported by result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `TINYINT` (and `BOOL`, which is `TINYINT(1)`)
    Tiny,
    Short,
    Int24,
    Long,
    LongLong,
    Float,
    Double,
    Decimal,
    Date,
    DateTime,
    Timestamp,
    Time,
    Year,
    String,
    VarString,
    Blob,
    Json,
    Null,
    Other,
}

impl ColumnType {
    /// Types whose text form is parsed into chrono values during hydration.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Time
        )
    }
}

/// Per-column result metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    /// Declared display length (`1` for `TINYINT(1)`).
    pub length: u64,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType, length: u64) -> Self {
        Self {
            name: name.into(),
            column_type,
            length,
        }
    }

    /// `TINYINT(1)`, the only integer column hydrated as a boolean.
    pub fn is_boolean(&self) -> bool {
        self.column_type == ColumnType::Tiny && self.length == 1
    }
}

/// A prepared statement.
pub trait Statement {
    /// Bind all parameters at once. `types` has one tag per value.
    fn bind_parameters(&mut self, types: &str, values: &[Value]) -> OrmResult<()>;

    fn execute(&mut self) -> OrmResult<()>;

    /// Column metadata of the result set, empty for statements without one.
    fn result_metadata(&self) -> OrmResult<Vec<ColumnMeta>>;

    /// Read the next row into `slots`, one slot per result column.
    ///
    /// Returns `false` once the cursor is exhausted.
    fn fetch_row(&mut self, slots: &mut [Value]) -> OrmResult<bool>;

    /// Identifier generated by the last INSERT.
    fn insert_id(&self) -> u64;

    /// Rows changed by the last write.
    fn affected_rows(&self) -> u64;

    fn close(self) -> OrmResult<()>
    where
        Self: Sized;

    /// Close a statement whose execution or result processing failed with `error`.
    ///
    /// The statement may still hold an unread result set. The default simply closes it.
    fn close_after_error(self, error: &OrmError) -> OrmResult<()>
    where
        Self: Sized,
    {
        let _ = error;
        self.close()
    }
}

/// Something that can prepare statements, typically a single server session.
///
/// Only one statement is active at a time: the returned statement borrows the
/// connection mutably.
pub trait Connection {
    type Statement<'c>: Statement
    where
        Self: 'c;

    fn prepare(&mut self, sql: &str) -> OrmResult<Self::Statement<'_>>;
}
