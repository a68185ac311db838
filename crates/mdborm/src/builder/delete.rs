use super::traits::{MutationBuilder, SqlBuilder};
use crate::condition::ConditionBuilder;
use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_field;
use crate::param::Params;

/// DELETE builder.
///
/// Refuses to run without a WHERE clause unless
/// [`allow_delete_all`](Self::allow_delete_all) is set.
#[derive(Debug, Clone, Default)]
pub struct DeleteBuilder {
    /// Table name
    table: String,
    conditions: Option<ConditionBuilder>,
    limit: Option<u64>,
    /// Whether deleting every row (no WHERE) is allowed
    allow_delete_all: bool,
}

impl DeleteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder deleting from `table`.
    pub fn delete_from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn from_table(&mut self, table: &str) -> &mut Self {
        self.table = table.to_string();
        self
    }

    /// Allow deleting the whole table (no WHERE).
    pub fn allow_delete_all(&mut self, allow: bool) -> &mut Self {
        self.allow_delete_all = allow;
        self
    }

    /// ` LIMIT n`, last call wins.
    pub fn limit(&mut self, rows: u64) -> &mut Self {
        self.limit = Some(rows);
        self
    }

    condition_methods!();

    /// Execute and return the number of deleted rows.
    ///
    /// # Panics
    ///
    /// When no table has been set.
    pub fn execute<C: Connection>(&self, conn: &mut C) -> OrmResult<u64> {
        assert!(
            !self.table.is_empty(),
            "DeleteBuilder::execute called without a table"
        );
        Ok(self.run(conn)?.affected_rows)
    }
}

impl SqlBuilder for DeleteBuilder {
    fn build_sql(&self) -> String {
        let mut sql = format!("DELETE FROM {}", quote_field(&self.table));
        sql.push_str(&self.where_sql());
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }

    fn params(&self) -> Params {
        self.params_with_conditions(&Params::new())
    }

    fn validate(&self) -> OrmResult<()> {
        if !self.allow_delete_all && !self.has_conditions() {
            return Err(OrmError::validation(format!(
                "DELETE FROM {} has no WHERE clause; call allow_delete_all(true) to delete every row",
                self.table
            )));
        }
        Ok(())
    }
}

impl MutationBuilder for DeleteBuilder {}
