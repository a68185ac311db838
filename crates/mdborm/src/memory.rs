//! Scripted in-memory [`Connection`].
//!
//! `MemoryConnection` answers statements from a queue of scripted responses
//! and records every prepared statement with its bound params. It is what the
//! crate's own tests run against and works the same way for application tests.
//!
//! # Example
//! ```
//! use mdborm::memory::{MemoryConnection, ResultSet};
//! use mdborm::{ColumnType, SelectBuilder, Value};
//!
//! let mut conn = MemoryConnection::new();
//! conn.push_result(
//!     ResultSet::new()
//!         .column("id", ColumnType::LongLong, 20)
//!         .row(vec![Value::Int(1)]),
//! );
//!
//! let mut q = SelectBuilder::from_table("movies");
//! q.select("id");
//! let rows = q.fetch(&mut conn).unwrap();
//!
//! assert_eq!(rows.len(), 1);
//! assert_eq!(conn.statements()[0].sql, "SELECT `id` FROM `movies`");
//! ```

use std::collections::VecDeque;

use crate::connection::{ColumnMeta, ColumnType, Connection, Statement};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Error raised by [`MemoryConnection`], wrapped in [`OrmError::Driver`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MemoryError(pub String);

/// Scripted result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: &str, column_type: ColumnType, length: u64) -> Self {
        self.columns.push(ColumnMeta::new(name, column_type, length));
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }
}

#[derive(Debug, Clone)]
enum Response {
    Rows(ResultSet),
    Write { insert_id: u64, affected_rows: u64 },
    Error(String),
}

/// A statement as seen by the connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub types: String,
    pub values: Vec<Value>,
    pub executed: bool,
    pub closed: bool,
}

#[derive(Debug, Default)]
pub struct MemoryConnection {
    responses: VecDeque<Response>,
    statements: Vec<ExecutedStatement>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next statement with a result set.
    pub fn push_result(&mut self, result: ResultSet) -> &mut Self {
        self.responses.push_back(Response::Rows(result));
        self
    }

    /// Answer the next statement as a write.
    pub fn push_write(&mut self, insert_id: u64, affected_rows: u64) -> &mut Self {
        self.responses.push_back(Response::Write {
            insert_id,
            affected_rows,
        });
        self
    }

    /// Fail the next statement at execution.
    pub fn push_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.responses.push_back(Response::Error(message.into()));
        self
    }

    /// Every statement prepared so far, oldest first.
    pub fn statements(&self) -> &[ExecutedStatement] {
        &self.statements
    }

    pub fn last_statement(&self) -> Option<&ExecutedStatement> {
        self.statements.last()
    }

    /// Scripted responses not consumed yet.
    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

impl Connection for MemoryConnection {
    type Statement<'c> = MemoryStatement<'c>;

    fn prepare(&mut self, sql: &str) -> OrmResult<MemoryStatement<'_>> {
        let response = self.responses.pop_front().unwrap_or(Response::Write {
            insert_id: 0,
            affected_rows: 0,
        });
        self.statements.push(ExecutedStatement {
            sql: sql.to_string(),
            ..ExecutedStatement::default()
        });
        let index = self.statements.len() - 1;
        Ok(MemoryStatement {
            conn: self,
            index,
            response,
            cursor: 0,
        })
    }
}

pub struct MemoryStatement<'c> {
    conn: &'c mut MemoryConnection,
    index: usize,
    response: Response,
    cursor: usize,
}

impl MemoryStatement<'_> {
    fn record(&mut self) -> &mut ExecutedStatement {
        &mut self.conn.statements[self.index]
    }
}

fn driver_error(message: impl Into<String>) -> OrmError {
    OrmError::driver(MemoryError(message.into()))
}

impl Statement for MemoryStatement<'_> {
    fn bind_parameters(&mut self, types: &str, values: &[Value]) -> OrmResult<()> {
        if types.chars().count() != values.len() {
            return Err(driver_error(format!(
                "{} type tags for {} values",
                types.chars().count(),
                values.len()
            )));
        }
        let placeholders = self.record().sql.matches('?').count();
        if placeholders != values.len() {
            return Err(driver_error(format!(
                "statement has {placeholders} placeholders but {} values were bound",
                values.len()
            )));
        }
        let record = self.record();
        record.types = types.to_string();
        record.values = values.to_vec();
        Ok(())
    }

    fn execute(&mut self) -> OrmResult<()> {
        self.record().executed = true;
        match &self.response {
            Response::Error(message) => Err(driver_error(message.clone())),
            _ => Ok(()),
        }
    }

    fn result_metadata(&self) -> OrmResult<Vec<ColumnMeta>> {
        match &self.response {
            Response::Rows(result) => Ok(result.columns.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn fetch_row(&mut self, slots: &mut [Value]) -> OrmResult<bool> {
        let Response::Rows(result) = &self.response else {
            return Ok(false);
        };
        let Some(row) = result.rows.get(self.cursor) else {
            return Ok(false);
        };
        if row.len() != slots.len() {
            return Err(driver_error(format!(
                "row has {} values for {} result slots",
                row.len(),
                slots.len()
            )));
        }
        slots.clone_from_slice(row);
        self.cursor += 1;
        Ok(true)
    }

    fn insert_id(&self) -> u64 {
        match self.response {
            Response::Write { insert_id, .. } => insert_id,
            _ => 0,
        }
    }

    fn affected_rows(&self) -> u64 {
        match self.response {
            Response::Write { affected_rows, .. } => affected_rows,
            _ => 0,
        }
    }

    fn close(mut self) -> OrmResult<()> {
        self.record().closed = true;
        Ok(())
    }
}
