use std::collections::HashSet;

use mqtt_session::collab::{AclAction, AclBackend};

/// Default backend: everything is allowed. Used when no ACL file is configured.
#[derive(Debug, Default)]
pub struct AllowAll;

impl AclBackend for AllowAll {
    fn check(&self, _client_id: &str, _username: Option<&str>, _action: AclAction, _topic: &str) -> bool {
        true
    }
}

/// Denies publish to an explicit set of topic names; everything else, and all
/// subscriptions, are allowed. Enough to exercise the ACL-deny paths in tests
/// without a full rule-matching engine.
#[derive(Debug, Default)]
pub struct DenyListAcl {
    denied_publish_topics: HashSet<String>,
}

impl DenyListAcl {
    pub fn new(denied_publish_topics: impl IntoIterator<Item = String>) -> Self {
        DenyListAcl {
            denied_publish_topics: denied_publish_topics.into_iter().collect(),
        }
    }
}

impl AclBackend for DenyListAcl {
    fn check(&self, _client_id: &str, _username: Option<&str>, action: AclAction, topic: &str) -> bool {
        match action {
            AclAction::Publish => !self.denied_publish_topics.contains(topic),
            AclAction::Subscribe => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_always_allows() {
        let acl = AllowAll;
        assert!(acl.check("c1", None, AclAction::Publish, "a/b"));
        assert!(acl.check("c1", None, AclAction::Subscribe, "a/#"));
    }

    #[test]
    fn deny_list_blocks_only_named_publish_topics() {
        let acl = DenyListAcl::new(["secret/topic".to_string()]);
        assert!(!acl.check("c1", None, AclAction::Publish, "secret/topic"));
        assert!(acl.check("c1", None, AclAction::Publish, "public/topic"));
        assert!(acl.check("c1", None, AclAction::Subscribe, "secret/topic"));
    }
}
