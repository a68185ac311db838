use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Statement kind, from the leading SQL keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (DDL, REPLACE, SET ...)
    Other,
}

impl QueryType {
    /// Detect the query type from the leading keyword of `sql`.
    ///
    /// Leading whitespace, `/* ... */` blocks and `--`/`#` line comments are
    /// skipped first.
    pub fn from_sql(sql: &str) -> Self {
        let keyword: String = strip_sql_prefix(sql)
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        if keyword.eq_ignore_ascii_case("SELECT") {
            QueryType::Select
        } else if keyword.eq_ignore_ascii_case("INSERT") {
            QueryType::Insert
        } else if keyword.eq_ignore_ascii_case("UPDATE") {
            QueryType::Update
        } else if keyword.eq_ignore_ascii_case("DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

fn strip_sql_prefix(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("/*") {
            sql = match rest.find("*/") {
                Some(end) => &rest[end + 2..],
                None => "",
            };
        } else if let Some(rest) = sql.strip_prefix("--").or_else(|| sql.strip_prefix('#')) {
            sql = match rest.find('\n') {
                Some(end) => &rest[end + 1..],
                None => "",
            };
        } else {
            return sql;
        }
    }
}

/// Context information about the statement being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL as produced by the builder, used as the metrics key.
    pub canonical_sql: String,
    /// The SQL actually sent to the server.
    pub exec_sql: String,
    /// Number of parameters.
    pub param_count: usize,
    /// Bind type tags (`i`, `d`, `s`), one per parameter. Empty until bound.
    pub types: String,
    /// Detected query type.
    pub query_type: QueryType,
    /// Caller-chosen label, e.g. the repository method issuing the statement.
    pub tag: Option<String>,
    /// Extra key/value labels. Keep the value set small.
    pub fields: BTreeMap<String, String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            canonical_sql: sql.to_string(),
            exec_sql: sql.to_string(),
            param_count,
            types: String::new(),
            query_type: QueryType::from_sql(sql),
            tag: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Number of `COLUMN_CREATE`/`COLUMN_GET`/`COLUMN_JSON` calls in the executed SQL.
    pub fn dynamic_column_calls(&self) -> usize {
        ["COLUMN_CREATE(", "COLUMN_GET(", "COLUMN_JSON("]
            .iter()
            .map(|call| self.exec_sql.matches(call).count())
            .sum()
    }

    /// Apply a hook's decision. `Abort` yields its reason.
    pub(crate) fn apply(&mut self, action: HookAction) -> Result<(), String> {
        match action {
            HookAction::Continue => Ok(()),
            HookAction::ModifySql {
                exec_sql,
                canonical_sql,
            } => {
                self.exec_sql = exec_sql;
                if let Some(canonical_sql) = canonical_sql {
                    self.canonical_sql = canonical_sql;
                }
                self.query_type = QueryType::from_sql(&self.canonical_sql);
                Ok(())
            }
            HookAction::Abort(reason) => Err(reason),
        }
    }
}

const MAX_ERROR_LEN: usize = 512;

/// Result of a statement execution for monitoring purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Rows fetched from a result set.
    Rows(usize),
    /// Rows affected by a write.
    Affected(u64),
    /// Execution failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating the message.
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            let truncated = super::truncate_sql_bytes(&msg, MAX_ERROR_LEN);
            Self::Error(format!("{truncated}..."))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Trait for monitoring statement execution.
///
/// Receives timing and outcome of every statement run through an
/// [`InstrumentedConnection`](super::InstrumentedConnection) with monitoring enabled.
pub trait QueryMonitor: Send + Sync {
    /// Called right before a statement is executed.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called once a statement completes (success or failure).
    ///
    /// For result sets this is after the last row has been fetched, so
    /// `duration` covers execution and fetching.
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when a statement exceeds the slow query threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}

/// Action to take after a hook processes a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Continue with the original SQL.
    Continue,
    /// Run different SQL with the same placeholders.
    ModifySql {
        /// SQL to send to the server.
        exec_sql: String,
        /// Optional override for canonical SQL (metrics key).
        canonical_sql: Option<String>,
    },
    /// Abort with an error.
    Abort(String),
}

/// Trait for hooking into the statement lifecycle.
///
/// Hooks run at prepare time and can inspect, modify, or abort statements.
/// A modified SQL must keep the same placeholders.
pub trait QueryHook: Send + Sync {
    /// Called before a statement is prepared.
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    /// Called after a statement completes, before monitors see it.
    ///
    /// Runs whether or not monitoring is enabled.
    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}
