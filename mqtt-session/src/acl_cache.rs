use std::collections::HashMap;
use std::sync::Arc;

/// Per-session memoization of publish-ACL decisions. Keyed by topic name
/// for the lifetime of the session; dropped with it. Subscribe ACL decisions are
/// never cached — callers simply don't consult this for SUBSCRIBE.
#[derive(Debug, Default)]
pub struct AclCache {
    decisions: HashMap<Arc<str>, bool>,
    enabled: bool,
}

impl AclCache {
    pub fn new(enabled: bool) -> Self {
        AclCache {
            decisions: HashMap::new(),
            enabled,
        }
    }

    /// Returns the cached decision for `topic`, or calls `check` on a miss and
    /// stores the result. When the cache is disabled, always calls `check`.
    pub fn get_or_check(&mut self, topic: &str, check: impl FnOnce() -> bool) -> bool {
        if !self.enabled {
            return check();
        }
        if let Some(&decision) = self.decisions.get(topic) {
            return decision;
        }
        let decision = check();
        self.decisions.insert(Arc::from(topic), decision);
        decision
    }
}
