use super::*;
use crate::builder::{SelectBuilder, delete_from, insert_into};
use crate::connection::ColumnType;
use crate::error::OrmError;
use crate::memory::{MemoryConnection, ResultSet};
use crate::value::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Capture(Mutex<Vec<(String, QueryResult)>>);

impl QueryMonitor for Capture {
    fn on_query_complete(&self, ctx: &QueryContext, _: Duration, result: &QueryResult) {
        self.0
            .lock()
            .unwrap()
            .push((ctx.exec_sql.clone(), result.clone()));
    }
}

fn monitored(capture: &Arc<Capture>) -> InstrumentedConnection<MemoryConnection> {
    InstrumentedConnection::new(MemoryConnection::new())
        .with_config(MonitorConfig::new().enable_monitoring())
        .with_monitor_arc(capture.clone())
}

#[test]
fn test_query_type_detection() {
    assert_eq!(
        QueryType::from_sql("SELECT * FROM `movies`"),
        QueryType::Select
    );
    assert_eq!(QueryType::from_sql("  select 1"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("INSERT INTO `movies` SET `title` = ?"),
        QueryType::Insert
    );
    assert_eq!(
        QueryType::from_sql("UPDATE `movies` SET `title` = ?"),
        QueryType::Update
    );
    assert_eq!(
        QueryType::from_sql("DELETE FROM `movies` WHERE `id` = ?"),
        QueryType::Delete
    );
    assert_eq!(
        QueryType::from_sql("REPLACE INTO `movies` SET `id` = ?"),
        QueryType::Other
    );
    assert_eq!(QueryType::from_sql("SELECTED"), QueryType::Other);
}

#[test]
fn query_type_skips_leading_comments() {
    assert_eq!(
        QueryType::from_sql("/* traced */ SELECT 1"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("-- audit\n# twice\nDELETE FROM `t`"),
        QueryType::Delete
    );
    assert_eq!(QueryType::from_sql("/* unterminated"), QueryType::Other);
}

#[test]
fn test_logging_monitor_truncation() {
    let monitor = LoggingMonitor::new().max_sql_length(10);
    assert_eq!(monitor.truncate_sql("SELECT * FROM users"), "SELECT * F...");
    assert_eq!(monitor.truncate_sql("SELECT 1"), "SELECT 1");
}

#[test]
fn logging_monitor_line_shows_bind_types_and_dynamic_calls() {
    let mut ctx = QueryContext::new(
        "INSERT INTO `movies` SET `title` = ?, `dyn_titles` = COLUMN_CREATE(?, ?)",
        3,
    )
    .with_tag("import");
    ctx.types = "sss".to_string();

    let line = LoggingMonitor::new().prefix("[db]").format_line(
        &ctx,
        Duration::from_micros(1500),
        &QueryResult::Affected(1),
    );
    assert_eq!(
        line,
        "[db] Insert 1.500ms 1 affected tag=import types=sss dyn=1 \
         INSERT INTO `movies` SET `title` = ?, `dyn_titles` = COLUMN_CREATE(?, ?)"
    );
}

#[test]
fn dynamic_column_calls_are_counted_in_executed_sql() {
    let ctx = QueryContext::new(
        "SELECT COLUMN_GET(`dyn_t`, ? AS CHAR(255)), COLUMN_JSON(`dyn_t`) FROM `m`",
        1,
    );
    assert_eq!(ctx.dynamic_column_calls(), 2);
    assert_eq!(QueryContext::new("SELECT 1", 0).dynamic_column_calls(), 0);
}

#[test]
fn tracing_hook_truncates_on_char_boundary() {
    let hook = TracingSqlHook::new().max_sql_length(8);
    assert_eq!(hook.truncate_sql("SELECT 'été'"), "SELECT '...");
    assert_eq!(hook.no_truncate().truncate_sql("SELECT 'été'"), "SELECT 'été'");
}

#[test]
fn stats_monitor_tracks_all_query_types() {
    let monitor = StatsMonitor::new();

    monitor.on_query_complete(
        &QueryContext::new("SELECT 1", 0),
        Duration::from_millis(1),
        &QueryResult::Rows(4),
    );
    monitor.on_query_complete(
        &QueryContext::new("INSERT INTO t SET x = 1", 0),
        Duration::from_millis(2),
        &QueryResult::Affected(1),
    );
    monitor.on_query_complete(
        &QueryContext::new("UPDATE t SET x = 1", 0),
        Duration::from_millis(3),
        &QueryResult::Affected(2),
    );
    monitor.on_query_complete(
        &QueryContext::new("DELETE FROM t WHERE id = 1", 0),
        Duration::from_millis(4),
        &QueryResult::Affected(1),
    );
    monitor.on_query_complete(
        &QueryContext::new("CREATE TABLE t (id INT)", 0),
        Duration::from_millis(5),
        &QueryResult::Affected(0),
    );
    monitor.on_query_complete(
        &QueryContext::new("SELECT bad", 0),
        Duration::from_millis(1),
        &QueryResult::error("some error".to_string()),
    );

    let stats = monitor.stats();
    assert_eq!(stats.total_queries, 6);
    assert_eq!(stats.select_count, 2);
    assert_eq!(stats.insert_count, 1);
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.failed_queries, 1);
    assert_eq!(stats.rows_fetched, 4);
    assert_eq!(stats.rows_affected, 4);
    assert_eq!(stats.total_duration, Duration::from_millis(16));
}

#[test]
fn stats_monitor_tracks_slowest_query() {
    let monitor = StatsMonitor::new();

    for (sql, ms) in [("SELECT fast", 10), ("SELECT slow", 100), ("SELECT medium", 50)] {
        monitor.on_query_complete(
            &QueryContext::new(sql, 0),
            Duration::from_millis(ms),
            &QueryResult::Rows(0),
        );
    }

    let stats = monitor.stats();
    assert_eq!(stats.max_duration, Duration::from_millis(100));
    assert_eq!(stats.slowest_query.as_deref(), Some("SELECT slow"));
}

#[test]
fn stats_monitor_reset_clears_all() {
    let monitor = StatsMonitor::new();
    monitor.on_query_complete(
        &QueryContext::new("SELECT 1", 0),
        Duration::from_millis(10),
        &QueryResult::Rows(1),
    );
    assert_eq!(monitor.stats().total_queries, 1);

    monitor.reset();
    assert_eq!(monitor.stats(), QueryStats::default());
}

#[test]
fn stats_monitor_row_counts_saturate() {
    let monitor = StatsMonitor::new();
    for n in [u64::MAX - 1, 5] {
        monitor.on_query_complete(
            &QueryContext::new("UPDATE t SET x = 1", 0),
            Duration::from_millis(1),
            &QueryResult::Affected(n),
        );
    }

    let stats = monitor.stats();
    assert_eq!(stats.rows_affected, u64::MAX);
    assert_eq!(stats.average_duration(), Duration::from_millis(1));
}

#[test]
fn stats_average_duration_is_zero_before_any_query() {
    assert_eq!(QueryStats::default().average_duration(), Duration::ZERO);
}

#[test]
fn composite_hook_chains_multiple_modifiers() {
    struct PrefixHook(&'static str);
    impl QueryHook for PrefixHook {
        fn before_query(&self, ctx: &QueryContext) -> HookAction {
            HookAction::ModifySql {
                exec_sql: format!("{}{}", self.0, ctx.exec_sql),
                canonical_sql: None,
            }
        }
    }

    let hook = CompositeHook::new()
        .add(PrefixHook("/* a */ "))
        .add(PrefixHook("/* b */ "));

    let ctx = QueryContext::new("SELECT 1", 0);
    assert_eq!(
        hook.before_query(&ctx),
        HookAction::ModifySql {
            exec_sql: "/* b */ /* a */ SELECT 1".to_string(),
            canonical_sql: None,
        }
    );
}

#[test]
fn composite_hook_abort_stops_chain() {
    struct AbortHook;
    impl QueryHook for AbortHook {
        fn before_query(&self, _ctx: &QueryContext) -> HookAction {
            HookAction::Abort("blocked".to_string())
        }
    }
    struct PanicHook;
    impl QueryHook for PanicHook {
        fn before_query(&self, _ctx: &QueryContext) -> HookAction {
            panic!("should not be called");
        }
    }

    let hook = CompositeHook::new().add(AbortHook).add(PanicHook);
    let ctx = QueryContext::new("SELECT 1", 0);
    assert_eq!(
        hook.before_query(&ctx),
        HookAction::Abort("blocked".to_string())
    );
}

#[test]
fn composite_hook_continue_only_returns_continue() {
    struct NoopHook;
    impl QueryHook for NoopHook {}

    let hook = CompositeHook::new().add(NoopHook).add(NoopHook);
    let ctx = QueryContext::new("SELECT 1", 0);
    assert_eq!(hook.before_query(&ctx), HookAction::Continue);
}

#[test]
fn query_result_error_truncation() {
    let short = QueryResult::error("short error".to_string());
    assert_eq!(short, QueryResult::Error("short error".to_string()));

    match QueryResult::error("x".repeat(1000)) {
        QueryResult::Error(s) => {
            assert_eq!(s.len(), 515);
            assert!(s.ends_with("..."));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[test]
fn query_result_display() {
    assert_eq!(QueryResult::Rows(5).to_string(), "5 rows");
    assert_eq!(QueryResult::Affected(3).to_string(), "3 affected");
    assert_eq!(
        QueryResult::Error("oops".to_string()).to_string(),
        "error: oops"
    );
}

#[test]
fn writes_are_reported_after_execute() {
    let capture = Arc::new(Capture::default());
    let mut conn = monitored(&capture);
    conn.inner_mut().push_write(7, 1);

    let id = insert_into("movies")
        .set("title", "Alien")
        .execute(&mut conn)
        .unwrap();

    assert_eq!(id, 7);
    assert_eq!(
        *capture.0.lock().unwrap(),
        vec![(
            "INSERT INTO `movies` SET `title` = ?".to_string(),
            QueryResult::Affected(1)
        )]
    );
}

#[test]
fn result_sets_are_reported_after_the_last_row() {
    let capture = Arc::new(Capture::default());
    let mut conn = monitored(&capture);
    conn.inner_mut().push_result(
        ResultSet::new()
            .column("id", ColumnType::LongLong, 20)
            .row(vec![Value::Int(1)])
            .row(vec![Value::Int(2)]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select("id");
    let rows = q.fetch(&mut conn).unwrap();

    assert_eq!(rows.len(), 2);
    let seen = capture.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, QueryResult::Rows(2));
}

#[test]
fn driver_errors_are_reported_and_passed_through() {
    let capture = Arc::new(Capture::default());
    let mut conn = monitored(&capture);
    conn.inner_mut().push_error("Lock wait timeout exceeded");

    let err = delete_from("movies")
        .and_where("id", 3)
        .execute(&mut conn)
        .unwrap_err();

    assert!(err.is_driver());
    let seen = capture.0.lock().unwrap();
    assert_eq!(
        seen[0].1,
        QueryResult::Error("Driver error: Lock wait timeout exceeded".to_string())
    );
}

#[test]
fn hook_abort_prevents_prepare() {
    struct BlockDeletes;
    impl QueryHook for BlockDeletes {
        fn before_query(&self, ctx: &QueryContext) -> HookAction {
            if ctx.query_type == QueryType::Delete {
                HookAction::Abort("DELETE not allowed".to_string())
            } else {
                HookAction::Continue
            }
        }
    }

    let mut conn = InstrumentedConnection::new(MemoryConnection::new()).with_hook(BlockDeletes);
    let err = delete_from("movies")
        .and_where("id", 1)
        .execute(&mut conn)
        .unwrap_err();

    assert!(matches!(err, OrmError::Validation(ref msg) if msg.ends_with("DELETE not allowed")));
    assert!(conn.inner().statements().is_empty());
}

#[test]
fn hook_modifies_executed_sql() {
    struct AddComment;
    impl QueryHook for AddComment {
        fn before_query(&self, ctx: &QueryContext) -> HookAction {
            HookAction::ModifySql {
                exec_sql: format!("/* traced */ {}", ctx.exec_sql),
                canonical_sql: None,
            }
        }
    }

    let capture = Arc::new(Capture::default());
    let mut conn = monitored(&capture).with_hook(AddComment);
    conn.inner_mut().push_write(0, 2);

    crate::builder::update("movies")
        .set("seen", true)
        .and_where("id", vec![1, 2])
        .execute(&mut conn)
        .unwrap();

    let sql = "/* traced */ UPDATE `movies` SET `seen` = ? WHERE `id` IN (?, ?)";
    assert_eq!(conn.inner().statements()[0].sql, sql);
    assert_eq!(capture.0.lock().unwrap()[0].0, sql);
}

#[test]
fn monitoring_disabled_skips_monitor() {
    struct FailMonitor;
    impl QueryMonitor for FailMonitor {
        fn on_query_complete(&self, _: &QueryContext, _: Duration, _: &QueryResult) {
            panic!("should not be called when monitoring is disabled");
        }
    }

    let mut conn = InstrumentedConnection::new(MemoryConnection::new()).with_monitor(FailMonitor);
    assert!(!conn.is_monitoring_enabled());
    insert_into("movies").execute(&mut conn).unwrap();
}

#[test]
fn slow_query_threshold_triggers_on_slow_query() {
    #[derive(Default)]
    struct SlowCapture(Mutex<bool>);
    impl QueryMonitor for SlowCapture {
        fn on_query_complete(&self, _: &QueryContext, _: Duration, _: &QueryResult) {}
        fn on_slow_query(&self, _: &QueryContext, _: Duration) {
            *self.0.lock().unwrap() = true;
        }
    }

    // The inner layer's monitor runs inside the outer layer's timing.
    struct Sleepy;
    impl QueryMonitor for Sleepy {
        fn on_query_complete(&self, _: &QueryContext, _: Duration, _: &QueryResult) {
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    let capture = Arc::new(SlowCapture::default());
    let inner = InstrumentedConnection::new(MemoryConnection::new())
        .enable_monitoring()
        .with_monitor(Sleepy);
    let mut conn = InstrumentedConnection::new(inner)
        .with_config(
            MonitorConfig::new()
                .with_slow_query_threshold(Duration::from_millis(10))
                .enable_monitoring(),
        )
        .with_monitor_arc(capture.clone());

    insert_into("movies").execute(&mut conn).unwrap();
    assert!(*capture.0.lock().unwrap());
}

#[test]
fn stats_count_bound_params_and_dynamic_calls() {
    let stats = Arc::new(StatsMonitor::new());
    let mut conn = InstrumentedConnection::new(MemoryConnection::new())
        .enable_monitoring()
        .with_monitor_arc(stats.clone());
    conn.inner_mut().push_write(1, 1);

    insert_into("movies")
        .set("title", "Alien")
        .set_dynamic("titles", [("fr", "Le huitième passager")])
        .execute(&mut conn)
        .unwrap();

    let stats = stats.stats();
    assert_eq!(stats.insert_count, 1);
    assert_eq!(stats.params_bound, 3);
    assert_eq!(stats.dynamic_column_calls, 1);
}

#[test]
fn select_failing_during_hydration_is_reported_as_failed() {
    let stats = Arc::new(StatsMonitor::new());
    let mut conn = InstrumentedConnection::new(MemoryConnection::new())
        .enable_monitoring()
        .with_monitor_arc(stats.clone());
    conn.inner_mut().push_result(
        ResultSet::new()
            .column("titles", ColumnType::Blob, 65535)
            .row(vec![Value::from("[1, 2]")]),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select_dynamic_json("titles", crate::field::FieldOptions::new());
    let err = q.fetch(&mut conn).unwrap_err();

    assert!(matches!(err, OrmError::Decode { .. }));
    let stats = stats.stats();
    assert_eq!(stats.total_queries, 1);
    assert_eq!(stats.select_count, 1);
    assert_eq!(stats.failed_queries, 1);
    assert!(conn.inner().statements()[0].closed);
}

#[test]
fn select_with_mismatched_width_is_reported_as_failed() {
    let capture = Arc::new(Capture::default());
    let mut conn = monitored(&capture);
    conn.inner_mut().push_result(
        ResultSet::new()
            .column("id", ColumnType::LongLong, 20)
            .column("title", ColumnType::VarString, 255),
    );

    let mut q = SelectBuilder::from_table("movies");
    q.select("id");
    q.fetch(&mut conn).unwrap_err();

    let seen = capture.0.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].1.is_error());
}

#[test]
fn hooks_see_completions_while_monitoring_is_disabled() {
    #[derive(Default)]
    struct SeenTypes(Mutex<Vec<String>>);
    impl QueryHook for SeenTypes {
        fn after_query(&self, ctx: &QueryContext, _: Duration, _: &QueryResult) {
            self.0.lock().unwrap().push(ctx.types.clone());
        }
    }

    let hook = Arc::new(SeenTypes::default());
    let mut conn = InstrumentedConnection::new(MemoryConnection::new()).with_hook_arc(hook.clone());
    assert!(!conn.is_monitoring_enabled());

    crate::builder::update("movies")
        .set("rating", 4.5)
        .and_where("id", 9)
        .execute(&mut conn)
        .unwrap();

    assert_eq!(*hook.0.lock().unwrap(), vec!["dd".to_string()]);
}

#[test]
fn default_tag_is_attached_to_every_statement() {
    #[derive(Default)]
    struct Tags(Mutex<Vec<Option<String>>>);
    impl QueryMonitor for Tags {
        fn on_query_complete(&self, ctx: &QueryContext, _: Duration, _: &QueryResult) {
            self.0.lock().unwrap().push(ctx.tag.clone());
        }
    }

    let tags = Arc::new(Tags::default());
    let mut conn = InstrumentedConnection::new(MemoryConnection::new())
        .with_config(MonitorConfig::new().enable_monitoring().with_default_tag("replica"))
        .with_monitor_arc(tags.clone());

    insert_into("movies").execute(&mut conn).unwrap();
    assert_eq!(*tags.0.lock().unwrap(), vec![Some("replica".to_string())]);
}

#[test]
fn slow_threshold_is_strict() {
    let config = MonitorConfig::new().with_slow_query_threshold(Duration::from_millis(10));
    assert!(!config.is_slow(Duration::from_millis(10)));
    assert!(config.is_slow(Duration::from_millis(11)));
    assert!(!MonitorConfig::new().is_slow(Duration::MAX));
}
