//! Statement monitoring and hooks.
//!
//! This module provides traits and utilities for:
//! - Timing statement execution
//! - Hooking into the statement lifecycle (before prepare / after completion)
//! - Logging and statistics collection
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mdborm::memory::MemoryConnection;
//! use mdborm::monitor::{InstrumentedConnection, MonitorConfig, StatsMonitor, TracingSqlHook};
//! use mdborm::update;
//!
//! let stats = Arc::new(StatsMonitor::new());
//! let config = MonitorConfig::new()
//!     .with_slow_query_threshold(Duration::from_secs(1))
//!     .enable_monitoring();
//!
//! let mut conn = InstrumentedConnection::new(MemoryConnection::new())
//!     .with_config(config)
//!     .with_monitor_arc(stats.clone())
//!     .with_hook(TracingSqlHook::new());
//!
//! conn.inner_mut().push_write(0, 3);
//! let affected = update("movies")
//!     .set("archived", true)
//!     .and_where_op("year", "<", 1950)
//!     .execute(&mut conn)
//!     .unwrap();
//!
//! assert_eq!(affected, 3);
//! assert_eq!(stats.stats().update_count, 1);
//! assert_eq!(stats.stats().rows_affected, 3);
//! ```

use std::borrow::Cow;

mod config;
mod instrumented;
mod monitors;
mod tracing_hook;
mod types;

#[cfg(test)]
mod tests;

pub use config::MonitorConfig;
pub use instrumented::{InstrumentedConnection, InstrumentedStatement};
pub use monitors::{
    CompositeHook, CompositeMonitor, LoggingMonitor, NoopMonitor, QueryStats, StatsMonitor,
};
pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};

/// `sql` cut to at most `max` bytes plus `...`, never inside a character.
pub(crate) fn shorten_sql(sql: &str, max: Option<usize>) -> Cow<'_, str> {
    match max {
        Some(max) if sql.len() > max => Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max))),
        _ => Cow::Borrowed(sql),
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
