use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use mqtt_session::collab::{Registry, ShutdownReason};

/// Shared client-id registry used to detect takeover: a second CONNECT for a
/// `client_id` that already has a live session fires a `Conflict` shutdown at the
/// prior holder without synchronously waiting for it to finish tearing down.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<HashMap<String, oneshot::Sender<ShutdownReason>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry::default()
    }
}

impl Registry for ClientRegistry {
    /// Registers `client_id` as owned by the caller. If another session already
    /// holds it, that session's shutdown channel receives `Conflict` — fire and
    /// forget; a closed receiver (the old session already gone) is not an error.
    ///
    /// The previous entry is intentionally left untouched by the loser; only the
    /// new registration overwrites the map, so the winner never races the old
    /// session's own cleanup by removing an entry out from under it.
    fn register(&self, client_id: &str) -> oneshot::Receiver<ShutdownReason> {
        let (tx, rx) = oneshot::channel();
        let mut sessions = self.inner.lock().unwrap();
        if let Some(prior) = sessions.insert(client_id.to_string(), tx) {
            let _ = prior.send(ShutdownReason::Conflict);
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_registration_conflicts_the_first() {
        let registry = ClientRegistry::new();
        let first_shutdown = registry.register("c1");
        let _second_shutdown = registry.register("c1");

        assert_eq!(first_shutdown.await.unwrap(), ShutdownReason::Conflict);
    }

    #[tokio::test]
    async fn distinct_client_ids_do_not_conflict() {
        let registry = ClientRegistry::new();
        let a = registry.register("a");
        let _b = registry.register("b");

        // `a`'s receiver should still be pending; dropping the registry's sender
        // side would be the only way to resolve it, which hasn't happened.
        assert!(a.try_recv().is_err());
    }
}
