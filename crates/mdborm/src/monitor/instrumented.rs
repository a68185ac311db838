use super::config::MonitorConfig;
use super::monitors::{CompositeHook, NoopMonitor};
use super::types::{QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};
use crate::connection::{ColumnMeta, Connection, Statement};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hooks, monitor and config shared by an [`InstrumentedConnection`] and the
/// statements it prepares.
struct Instrumentation {
    monitor: Arc<dyn QueryMonitor>,
    hook: Option<Arc<dyn QueryHook>>,
    config: MonitorConfig,
}

impl Instrumentation {
    fn apply_hook(&self, ctx: &mut QueryContext) -> OrmResult<()> {
        let Some(hook) = &self.hook else {
            return Ok(());
        };
        let action = hook.before_query(ctx);
        ctx.apply(action)
            .map_err(|reason| OrmError::validation(format!("Query aborted by hook: {reason}")))
    }

    fn report_start(&self, ctx: &QueryContext) {
        if self.config.monitoring_enabled {
            self.monitor.on_query_start(ctx);
        }
    }

    fn report_result(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if let Some(hook) = &self.hook {
            hook.after_query(ctx, duration, result);
        }
        if !self.config.monitoring_enabled {
            return;
        }
        self.monitor.on_query_complete(ctx, duration, result);
        if self.config.is_slow(duration) {
            self.monitor.on_slow_query(ctx, duration);
        }
    }
}

/// A [`Connection`] wrapper that runs hooks and reports to monitors.
///
/// Hooks run when a statement is prepared and again when it completes.
/// Monitors additionally need [`MonitorConfig::enable_monitoring`].
///
/// A write completes at `execute`. A result set completes when its last row
/// has been fetched or the statement is closed, including a close after a
/// failure while rows were being processed.
pub struct InstrumentedConnection<C> {
    conn: C,
    instrumentation: Instrumentation,
}

impl<C: Connection> InstrumentedConnection<C> {
    /// Wrap `conn` with no monitoring.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            instrumentation: Instrumentation {
                monitor: Arc::new(NoopMonitor),
                hook: None,
                config: MonitorConfig::default(),
            },
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.instrumentation.config = config;
        self
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.instrumentation.monitor = monitor;
        self
    }

    /// Set the query hook, replacing any previous one.
    pub fn with_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.with_hook_arc(Arc::new(hook))
    }

    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.instrumentation.hook = Some(hook);
        self
    }

    /// Add a query hook.
    ///
    /// If a hook is already set, this composes it with the new hook (existing first).
    pub fn add_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_hook_arc(Arc::new(hook))
    }

    pub fn add_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.instrumentation.hook = Some(match self.instrumentation.hook.take() {
            None => hook,
            Some(existing) => Arc::new(CompositeHook::new().add_arc(existing).add_arc(hook)),
        });
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.instrumentation.config.monitoring_enabled = true;
        self
    }

    pub fn disable_monitoring(mut self) -> Self {
        self.instrumentation.config.monitoring_enabled = false;
        self
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.instrumentation.config.monitoring_enabled
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.instrumentation.config
    }

    pub fn inner(&self) -> &C {
        &self.conn
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C: Connection> Connection for InstrumentedConnection<C> {
    type Statement<'c>
        = InstrumentedStatement<'c, C>
    where
        Self: 'c;

    fn prepare(&mut self, sql: &str) -> OrmResult<Self::Statement<'_>> {
        let mut ctx = QueryContext::new(sql, sql.matches('?').count());
        ctx.tag = self.instrumentation.config.default_tag.clone();
        self.instrumentation.apply_hook(&mut ctx)?;
        let inner = self.conn.prepare(&ctx.exec_sql)?;
        Ok(InstrumentedStatement {
            inner,
            instrumentation: &self.instrumentation,
            ctx,
            started: None,
            rows: 0,
        })
    }
}

/// Statement prepared by an [`InstrumentedConnection`].
pub struct InstrumentedStatement<'c, C: Connection + 'c> {
    inner: C::Statement<'c>,
    instrumentation: &'c Instrumentation,
    ctx: QueryContext,
    /// Set by `execute` while a result set is still being read.
    started: Option<Instant>,
    rows: usize,
}

impl<'c, C: Connection + 'c> InstrumentedStatement<'c, C> {
    fn finish(&mut self, result: QueryResult) {
        if let Some(started) = self.started.take() {
            self.instrumentation
                .report_result(&self.ctx, started.elapsed(), &result);
        }
    }

    fn fail(&mut self, err: &OrmError) {
        self.finish(QueryResult::error(err.to_string()));
    }
}

impl<'c, C: Connection + 'c> Statement for InstrumentedStatement<'c, C> {
    fn bind_parameters(&mut self, types: &str, values: &[Value]) -> OrmResult<()> {
        self.ctx.param_count = values.len();
        self.ctx.types = types.to_string();
        self.inner.bind_parameters(types, values)
    }

    fn execute(&mut self) -> OrmResult<()> {
        self.instrumentation.report_start(&self.ctx);
        self.started = Some(Instant::now());
        self.rows = 0;

        if let Err(err) = self.inner.execute() {
            self.fail(&err);
            return Err(err);
        }
        if self.ctx.query_type != QueryType::Select {
            let affected = self.inner.affected_rows();
            self.finish(QueryResult::Affected(affected));
        }
        Ok(())
    }

    fn result_metadata(&self) -> OrmResult<Vec<ColumnMeta>> {
        self.inner.result_metadata()
    }

    fn fetch_row(&mut self, slots: &mut [Value]) -> OrmResult<bool> {
        match self.inner.fetch_row(slots) {
            Ok(true) => {
                self.rows += 1;
                Ok(true)
            }
            Ok(false) => {
                self.finish(QueryResult::Rows(self.rows));
                Ok(false)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn insert_id(&self) -> u64 {
        self.inner.insert_id()
    }

    fn affected_rows(&self) -> u64 {
        self.inner.affected_rows()
    }

    fn close(mut self) -> OrmResult<()> {
        self.finish(QueryResult::Rows(self.rows));
        self.inner.close()
    }

    fn close_after_error(mut self, error: &OrmError) -> OrmResult<()> {
        self.fail(error);
        self.inner.close_after_error(error)
    }
}
