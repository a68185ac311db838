use std::time::Duration;

/// Reporting settings of an [`InstrumentedConnection`](super::InstrumentedConnection).
///
/// Monitors only receive events once monitoring is enabled. Hooks are not
/// affected by this switch.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub monitoring_enabled: bool,
    /// Completed statements slower than this are also passed to `on_slow_query`.
    pub slow_query_threshold: Option<Duration>,
    /// Tag given to every statement context, so monitors shared by several
    /// connections can tell them apart.
    pub default_tag: Option<String>,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.monitoring_enabled = true;
        self
    }

    pub fn disable_monitoring(mut self) -> Self {
        self.monitoring_enabled = false;
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = Some(tag.into());
        self
    }

    /// Strictly above the threshold; never slow without one.
    pub fn is_slow(&self, duration: Duration) -> bool {
        self.slow_query_threshold
            .is_some_and(|threshold| duration > threshold)
    }
}
