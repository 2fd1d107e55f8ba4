use std::collections::HashMap;

use mqtt_core::qos::QoS;

/// The session's own view of its granted QoS per filter. The router holds
/// the authoritative routing table; this is the cached mirror the session
/// consults to detect duplicate/changed-QoS SUBSCRIBE requests. Delivery QoS
/// is not looked up here — a published topic can match a wildcard filter that
/// doesn't equal it, so the router attaches the matched filter's granted QoS
/// to each delivery instead (see `collab::Delivery`).
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    granted: HashMap<String, QoS>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Newly installed at the given granted QoS.
    Installed(QoS),
    /// Already present at the same granted QoS; a no-op.
    AlreadyAtQos(QoS),
    /// Was present at a different QoS; now updated to the given granted QoS.
    QosChanged { from: QoS, to: QoS },
}

impl SubscriptionTable {
    pub fn new() -> Self {
        SubscriptionTable::default()
    }

    pub fn get(&self, filter: &str) -> Option<QoS> {
        self.granted.get(filter).copied()
    }

    /// Applies a single (filter, requested_qos) entry, already hook-rewritten.
    /// `requested_qos` is degraded to {0,1} by the caller before this is reached.
    pub fn subscribe(&mut self, filter: &str, granted_qos: QoS) -> SubscribeOutcome {
        match self.granted.get(filter).copied() {
            None => {
                self.granted.insert(filter.to_string(), granted_qos);
                SubscribeOutcome::Installed(granted_qos)
            }
            Some(existing) if existing == granted_qos => SubscribeOutcome::AlreadyAtQos(existing),
            Some(existing) => {
                self.granted.insert(filter.to_string(), granted_qos);
                SubscribeOutcome::QosChanged {
                    from: existing,
                    to: granted_qos,
                }
            }
        }
    }

    /// Removes `filter` if present; returns whether it was present.
    pub fn unsubscribe(&mut self, filter: &str) -> bool {
        self.granted.remove(filter).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_new_subscription() {
        let mut table = SubscriptionTable::new();
        let outcome = table.subscribe("a/b", QoS::AtLeastOnce);
        assert_eq!(outcome, SubscribeOutcome::Installed(QoS::AtLeastOnce));
        assert_eq!(table.get("a/b"), Some(QoS::AtLeastOnce));
    }

    #[test]
    fn duplicate_subscribe_same_qos_is_noop() {
        let mut table = SubscriptionTable::new();
        table.subscribe("a/b", QoS::AtLeastOnce);
        let outcome = table.subscribe("a/b", QoS::AtLeastOnce);
        assert_eq!(outcome, SubscribeOutcome::AlreadyAtQos(QoS::AtLeastOnce));
    }

    #[test]
    fn duplicate_subscribe_different_qos_updates() {
        let mut table = SubscriptionTable::new();
        table.subscribe("a/b", QoS::AtMostOnce);
        let outcome = table.subscribe("a/b", QoS::AtLeastOnce);
        assert_eq!(
            outcome,
            SubscribeOutcome::QosChanged {
                from: QoS::AtMostOnce,
                to: QoS::AtLeastOnce
            }
        );
        assert_eq!(table.get("a/b"), Some(QoS::AtLeastOnce));
    }

    #[test]
    fn unsubscribe_missing_filter_is_noop() {
        let mut table = SubscriptionTable::new();
        assert!(!table.unsubscribe("never/subscribed"));
    }

    #[test]
    fn unsubscribe_existing_filter_removes_it() {
        let mut table = SubscriptionTable::new();
        table.subscribe("a/b", QoS::AtMostOnce);
        assert!(table.unsubscribe("a/b"));
        assert_eq!(table.get("a/b"), None);
    }
}
