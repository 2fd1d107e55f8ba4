use std::sync::atomic::{AtomicU64, Ordering};

use mqtt_session::collab::ClientIdGenerator;

/// Generates client ids for CONNECT packets that arrived with an empty id under
/// MQTT 3.1.1. Monotonic rather than random so collisions are structurally
/// impossible for the lifetime of one broker process.
#[derive(Debug, Default)]
pub struct GuidGenerator {
    next: AtomicU64,
}

impl GuidGenerator {
    pub fn new() -> Self {
        GuidGenerator {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("emqttd_{n}")
    }
}

impl ClientIdGenerator for GuidGenerator {
    fn generate(&self) -> String {
        self.next_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_prefixed() {
        let gen = GuidGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a, "emqttd_1");
        assert_eq!(b, "emqttd_2");
    }
}
