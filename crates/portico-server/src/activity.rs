//! Tracing-backed activity sink.

use portico_core::activity::ActivityLogger;
use serde_json::Value;

/// Emits one structured log line per recorded event under the
/// `portico::activity` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLogger;

impl ActivityLogger for TracingActivityLogger {
    fn record(&self, event: &str, params: &Value, module: &str, username: &str) {
        tracing::info!(
            target: "portico::activity",
            event = event,
            module = module,
            username = username,
            params = %params,
            "activity"
        );
    }
}
