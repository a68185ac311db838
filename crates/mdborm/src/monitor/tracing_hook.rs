use std::time::Duration;

use tracing::Level;

use super::shorten_sql;
use super::types::{QueryContext, QueryHook, QueryResult};
use crate::builder::SQL_TARGET;

/// Emits one `tracing` event per completed statement on the `mdborm.sql` target.
///
/// Each event carries the bind type tags, the number of dynamic-column calls
/// and the elapsed time next to the (shortened) SQL. Failed statements are
/// always logged at `WARN`; everything else at [`level`](Self::level).
///
/// Hooks see completions even while monitoring is disabled, so this works as
/// a plain SQL log.
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    pub level: Level,
    /// Longest SQL text logged, in bytes. `None` logs it whole.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        shorten_sql(sql, self.max_sql_length).into_owned()
    }
}

impl QueryHook for TracingSqlHook {
    fn after_query(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let sql = self.truncate_sql(&ctx.exec_sql);
        let tag = ctx.tag.as_deref().unwrap_or("-");
        let elapsed_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let dynamic_columns = ctx.dynamic_column_calls();

        if let QueryResult::Error(error) = result {
            tracing::warn!(
                target: SQL_TARGET,
                query_type = ?ctx.query_type,
                tag,
                types = %ctx.types,
                elapsed_us,
                sql = %sql,
                error = %error,
                "statement failed"
            );
            return;
        }

        // `tracing` levels are static per call site.
        macro_rules! completed {
            ($event:ident) => {
                tracing::$event!(
                    target: SQL_TARGET,
                    query_type = ?ctx.query_type,
                    tag,
                    types = %ctx.types,
                    dynamic_columns,
                    elapsed_us,
                    result = %result,
                    sql = %sql,
                    "statement completed"
                )
            };
        }

        if self.level == Level::TRACE {
            completed!(trace);
        } else if self.level == Level::DEBUG {
            completed!(debug);
        } else if self.level == Level::INFO {
            completed!(info);
        } else if self.level == Level::WARN {
            completed!(warn);
        } else {
            completed!(error);
        }
    }
}
