use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::shorten_sql;
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

/// Writes one line per completed statement to stderr.
///
/// ```text
/// [mdborm] Insert 0.412ms 1 affected types=sssd dyn=1 INSERT INTO `movies` SET ...
/// ```
#[derive(Debug, Clone)]
pub struct LoggingMonitor {
    /// Statements faster than this are not printed.
    pub min_duration: Option<Duration>,
    /// Longest SQL text printed, in bytes.
    pub max_sql_length: Option<usize>,
    pub prefix: String,
}

impl Default for LoggingMonitor {
    fn default() -> Self {
        Self {
            min_duration: None,
            max_sql_length: Some(200),
            prefix: "[mdborm]".to_string(),
        }
    }
}

impl LoggingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        shorten_sql(sql, self.max_sql_length).into_owned()
    }

    pub(crate) fn format_line(
        &self,
        ctx: &QueryContext,
        duration: Duration,
        result: &QueryResult,
    ) -> String {
        let mut line = format!(
            "{} {:?} {:.3}ms {}",
            self.prefix,
            ctx.query_type,
            duration.as_secs_f64() * 1000.0,
            result
        );
        if let Some(tag) = &ctx.tag {
            line.push_str(&format!(" tag={tag}"));
        }
        if !ctx.types.is_empty() {
            line.push_str(&format!(" types={}", ctx.types));
        }
        let dynamic = ctx.dynamic_column_calls();
        if dynamic > 0 {
            line.push_str(&format!(" dyn={dynamic}"));
        }
        line.push(' ');
        line.push_str(&self.truncate_sql(&ctx.exec_sql));
        line
    }
}

impl QueryMonitor for LoggingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if self.min_duration.is_some_and(|min| duration < min) {
            return;
        }
        eprintln!("{}", self.format_line(ctx, duration, result));
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        eprintln!(
            "{} slow {:?} statement took {:?}: {}",
            self.prefix,
            ctx.query_type,
            duration,
            self.truncate_sql(&ctx.canonical_sql)
        );
    }
}

/// Counters collected by [`StatsMonitor`]. All counts saturate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Statements that are none of the four above.
    pub other_count: u64,
    /// Rows read from result sets.
    pub rows_fetched: u64,
    /// Rows reported as affected by writes.
    pub rows_affected: u64,
    /// Bound parameter values, summed over all statements.
    pub params_bound: u64,
    /// Dynamic-column function calls, summed over all statements.
    pub dynamic_column_calls: u64,
    pub max_duration: Duration,
    /// Canonical SQL of the statement that took `max_duration`.
    pub slowest_query: Option<String>,
}

impl QueryStats {
    /// Mean duration of a statement, zero before the first one.
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.total_queries) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
            Err(_) => Duration::from_secs_f64(
                self.total_duration.as_secs_f64() / self.total_queries as f64,
            ),
        }
    }

    fn record(&mut self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.total_queries = self.total_queries.saturating_add(1);
        self.total_duration = self.total_duration.saturating_add(duration);

        let per_type = match ctx.query_type {
            QueryType::Select => &mut self.select_count,
            QueryType::Insert => &mut self.insert_count,
            QueryType::Update => &mut self.update_count,
            QueryType::Delete => &mut self.delete_count,
            QueryType::Other => &mut self.other_count,
        };
        *per_type = per_type.saturating_add(1);

        match result {
            QueryResult::Rows(n) => {
                self.rows_fetched = self.rows_fetched.saturating_add(*n as u64);
            }
            QueryResult::Affected(n) => {
                self.rows_affected = self.rows_affected.saturating_add(*n);
            }
            QueryResult::Error(_) => {
                self.failed_queries = self.failed_queries.saturating_add(1);
            }
        }

        self.params_bound = self.params_bound.saturating_add(ctx.param_count as u64);
        self.dynamic_column_calls = self
            .dynamic_column_calls
            .saturating_add(ctx.dynamic_column_calls() as u64);

        if duration > self.max_duration {
            self.max_duration = duration;
            self.slowest_query = Some(ctx.canonical_sql.clone());
        }
    }
}

/// Aggregates [`QueryStats`] across every statement it sees.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    stats: Mutex<QueryStats>,
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current counters.
    pub fn stats(&self) -> QueryStats {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = QueryStats::default();
    }

    fn lock(&self) -> MutexGuard<'_, QueryStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.lock().record(ctx, duration, result);
    }
}

/// Forwards every event to each of its monitors, in insertion order.
#[derive(Default)]
pub struct CompositeMonitor(Vec<Arc<dyn QueryMonitor>>);

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.add_arc(Arc::new(monitor))
    }

    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.0.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Arc<dyn QueryMonitor>> for CompositeMonitor {
    fn from_iter<I: IntoIterator<Item = Arc<dyn QueryMonitor>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        self.0.iter().for_each(|m| m.on_query_start(ctx));
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.0
            .iter()
            .for_each(|m| m.on_query_complete(ctx, duration, result));
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        self.0.iter().for_each(|m| m.on_slow_query(ctx, duration));
    }
}

/// Runs hooks in insertion order.
///
/// Each hook sees the SQL left by the hooks before it. The first `Abort` stops
/// the chain.
#[derive(Default)]
pub struct CompositeHook(Vec<Arc<dyn QueryHook>>);

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_arc(Arc::new(hook))
    }

    pub fn add_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.0.push(hook);
        self
    }
}

impl QueryHook for CompositeHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let mut chained = ctx.clone();
        for hook in &self.0 {
            let action = hook.before_query(&chained);
            if let Err(reason) = chained.apply(action) {
                return HookAction::Abort(reason);
            }
        }

        let canonical_changed = chained.canonical_sql != ctx.canonical_sql;
        if chained.exec_sql == ctx.exec_sql && !canonical_changed {
            return HookAction::Continue;
        }
        HookAction::ModifySql {
            exec_sql: chained.exec_sql,
            canonical_sql: canonical_changed.then_some(chained.canonical_sql),
        }
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.0
            .iter()
            .for_each(|h| h.after_query(ctx, duration, result));
    }
}
