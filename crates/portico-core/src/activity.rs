//! Activity logging collaborator contract.

use serde_json::Value;

/// Fire-and-forget structured activity sink. Implementations must
/// never fail in a way that affects control flow.
pub trait ActivityLogger: Send + Sync {
    fn record(&self, event: &str, params: &Value, module: &str, username: &str);
}
