use crate::connection::{Connection, Statement};
use crate::error::OrmResult;
use crate::param::Params;

/// `tracing` target of every statement event.
pub const SQL_TARGET: &str = "mdborm.sql";

/// Base trait for SQL builders.
pub trait SqlBuilder {
    /// Build the SQL string.
    fn build_sql(&self) -> String;

    /// Parameters in placeholder order.
    ///
    /// Builder-owned params come first, followed by the params of the attached
    /// condition. Both stay untouched.
    fn params(&self) -> Params;

    /// Debug helper.
    fn to_sql(&self) -> String {
        self.build_sql()
    }

    /// Validate builder state.
    fn validate(&self) -> OrmResult<()> {
        Ok(())
    }
}

/// Result of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub insert_id: u64,
    pub affected_rows: u64,
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE).
pub trait MutationBuilder: SqlBuilder {
    /// Validate, prepare, bind and execute the statement.
    ///
    /// The statement is closed whether or not execution succeeds.
    fn run<C: Connection>(&self, conn: &mut C) -> OrmResult<WriteOutcome> {
        self.validate()?;
        let sql = self.build_sql();
        let params = self.params();

        let mut stmt = prepare_bound(conn, &sql, &params)?;
        let executed = stmt.execute().map(|()| WriteOutcome {
            insert_id: stmt.insert_id(),
            affected_rows: stmt.affected_rows(),
        });
        let outcome = close_statement(stmt, executed)?;

        tracing::trace!(
            target: SQL_TARGET,
            insert_id = outcome.insert_id,
            affected_rows = outcome.affected_rows,
            "statement executed"
        );
        Ok(outcome)
    }
}

/// Prepare `sql` and bind `params` when there are any.
pub(crate) fn prepare_bound<'c, C: Connection>(
    conn: &'c mut C,
    sql: &str,
    params: &Params,
) -> OrmResult<C::Statement<'c>> {
    tracing::debug!(
        target: SQL_TARGET,
        sql,
        param_count = params.len(),
        types = params.types(),
        "prepare"
    );
    let mut stmt = conn.prepare(sql)?;
    if !params.is_empty() {
        if let Err(err) = stmt.bind_parameters(params.types(), params.values()) {
            return close_statement(stmt, Err(err));
        }
    }
    Ok(stmt)
}

/// Close `stmt`, then hand back `result`.
///
/// On failure the statement is closed through [`Statement::close_after_error`]
/// and the original error wins over any error raised while closing.
pub(crate) fn close_statement<S: Statement, T>(stmt: S, result: OrmResult<T>) -> OrmResult<T> {
    match result {
        Ok(value) => {
            stmt.close()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(close_err) = stmt.close_after_error(&err) {
                tracing::warn!(
                    target: SQL_TARGET,
                    error = %close_err,
                    "failed to close statement after an error"
                );
            }
            Err(err)
        }
    }
}
