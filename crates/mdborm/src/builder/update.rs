use super::traits::{MutationBuilder, SqlBuilder};
use crate::condition::ConditionBuilder;
use crate::connection::Connection;
use crate::dynamic::column_create;
use crate::error::{OrmError, OrmResult};
use crate::ident::{quote_dynamic_field, quote_field};
use crate::param::Params;
use crate::value::{ToValue, Value};

/// UPDATE builder.
///
/// Assignments are comma-joined in call order. Their params come before the
/// params of the WHERE clause.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    /// Table name
    table: String,
    alias: Option<String>,
    /// SET clauses
    assignments: Vec<String>,
    params: Params,
    conditions: Option<ConditionBuilder>,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder updating `table`.
    pub fn update(table: &str) -> Self {
        let mut builder = Self::new();
        builder.table(table);
        builder
    }

    pub fn table(&mut self, table: &str) -> &mut Self {
        self.table = table.to_string();
        self.alias = None;
        self
    }

    /// `UPDATE `table` AS `alias``
    pub fn table_as(&mut self, table: &str, alias: &str) -> &mut Self {
        self.table = table.to_string();
        self.alias = Some(alias.to_string());
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

    /// Replace a dynamic column with `COLUMN_CREATE` of the given pairs.
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

    /// `field = (field + 1)`
    pub fn increment(&mut self, field: &str) -> &mut Self {
        self.increment_by(field, 1)
    }

    /// `field = (field + ?)`
    pub fn increment_by<V: ToValue>(&mut self, field: &str, amount: V) -> &mut Self {
        self.arithmetic(field, '+', amount.to_param())
    }

    /// `field = (field - 1)`
    pub fn decrement(&mut self, field: &str) -> &mut Self {
        self.decrement_by(field, 1)
    }

    /// `field = (field - ?)`
    pub fn decrement_by<V: ToValue>(&mut self, field: &str, amount: V) -> &mut Self {
        self.arithmetic(field, '-', amount.to_param())
    }

    fn arithmetic(&mut self, field: &str, op: char, amount: Value) -> &mut Self {
        let column = quote_field(field);
        let placeholder = self.params.bind(amount);
        self.assignments
            .push(format!("{column} = ({column} {op} {placeholder})"));
        self
    }

    condition_methods!();

    /// Execute and return the number of affected rows.
    ///
    /// Fails with [`OrmError::Validation`] when nothing is set.
    ///
    /// # Panics
    ///
    /// When no table has been set, here and in [`MutationBuilder::run`].
    pub fn execute<C: Connection>(&self, conn: &mut C) -> OrmResult<u64> {
        Ok(self.run(conn)?.affected_rows)
    }
}

impl SqlBuilder for UpdateBuilder {
    fn build_sql(&self) -> String {
        let mut sql = format!("UPDATE {}", quote_field(&self.table));
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&quote_field(alias));
        }
        sql.push_str(" SET ");
        sql.push_str(&self.assignments.join(", "));
        sql.push_str(&self.where_sql());
        sql
    }

    fn params(&self) -> Params {
        self.params_with_conditions(&self.params)
    }

    fn validate(&self) -> OrmResult<()> {
        assert!(
            !self.table.is_empty(),
            "UpdateBuilder used without a table"
        );
        if self.assignments.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE {} has no SET clause",
                self.table
            )));
        }
        Ok(())
    }
}

impl MutationBuilder for UpdateBuilder {}
