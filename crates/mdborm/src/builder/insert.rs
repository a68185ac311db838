use super::traits::{MutationBuilder, SqlBuilder};
use crate::connection::Connection;
use crate::dynamic::column_create;
use crate::error::OrmResult;
use crate::ident::{quote_dynamic_field, quote_field};
use crate::param::Params;
use crate::value::ToValue;

/// INSERT builder.
///
/// Renders `INSERT INTO `t` SET `a` = ?, ...`, or
/// `INSERT INTO `t` () VALUES ()` when nothing is set.
#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    /// Table name
    table: String,
    /// `field = expr` assignments, in call order
    assignments: Vec<String>,
    params: Params,
}

impl InsertBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder inserting into `table`.
    pub fn insert_into(table: &str) -> Self {
        let mut builder = Self::new();
        builder.into_table(table);
        builder
    }

    /// Set the target table.
    pub fn into_table(&mut self, table: &str) -> &mut Self {
        self.table = table.to_string();
        self
    }

    /// Set a column.
    pub fn set<V: ToValue>(&mut self, field: &str, value: V) -> &mut Self {
        let placeholder = self.params.bind_param(&value);
        self.assignments
            .push(format!("{} = {placeholder}", quote_field(field)));
        self
    }

    /// Set an optional column (None => skip).
    pub fn set_opt<V: ToValue>(&mut self, field: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.set(field, v);
        }
        self
    }

    /// Set a dynamic column from key/value pairs (`COLUMN_CREATE`).
    ///
    /// Falsy values other than the text `"0"` are left out; see
    /// [`is_omitted`](crate::dynamic::is_omitted).
    pub fn set_dynamic<I, K, V>(&mut self, field: &str, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToValue,
    {
        let expr = column_create(&mut self.params, pairs);
        self.assignments
            .push(format!("{} = {expr}", quote_dynamic_field(field)));
        self
    }

    /// Set a column to the JSON serialization of `value`.
    pub fn set_json<T>(&mut self, field: &str, value: &T) -> OrmResult<&mut Self>
    where
        T: serde::Serialize + ?Sized,
    {
        let json = serde_json::to_string(value)?;
        Ok(self.set(field, json))
    }

    /// Set a raw SQL expression.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    pub fn set_raw(&mut self, field: &str, expr: &str) -> &mut Self {
        self.assignments
            .push(format!("{} = {expr}", quote_field(field)));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Execute and return the generated identifier.
    ///
    /// # Panics
    ///
    /// When no table has been set, here and in [`MutationBuilder::run`].
    pub fn execute<C: Connection>(&self, conn: &mut C) -> OrmResult<u64> {
        Ok(self.run(conn)?.insert_id)
    }
}

impl SqlBuilder for InsertBuilder {
    fn build_sql(&self) -> String {
        let table = quote_field(&self.table);
        if self.assignments.is_empty() {
            format!("INSERT INTO {table} () VALUES ()")
        } else {
            format!(
                "INSERT INTO {table} SET {}",
                self.assignments.join(", ")
            )
        }
    }

    fn params(&self) -> Params {
        self.params.clone()
    }

    fn validate(&self) -> OrmResult<()> {
        assert!(
            !self.table.is_empty(),
            "InsertBuilder used without a table"
        );
        Ok(())
    }
}

impl MutationBuilder for InsertBuilder {}
