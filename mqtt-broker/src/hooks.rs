use mqtt_core::qos::QoS;
use mqtt_session::collab::{DisconnectReason, Hooks};

/// Default hook set: logs every milestone via `tracing`, rewrites nothing.
#[derive(Debug, Default)]
pub struct LoggingHooks;

impl Hooks for LoggingHooks {
    fn client_connected(&self, client_id: &str, return_code: u8) {
        tracing::info!(client_id, return_code, "client connected");
    }

    fn client_subscribed(&self, client_id: &str, filter: &str, qos: QoS) {
        tracing::info!(client_id, filter, qos = qos.as_byte(), "client subscribed");
    }

    fn client_unsubscribe(&self, client_id: &str, filters: &[String]) {
        tracing::info!(client_id, ?filters, "client unsubscribing");
    }

    fn client_disconnected(&self, client_id: &str, reason: DisconnectReason) {
        tracing::info!(client_id, ?reason, "client disconnected");
    }

    fn message_acked(&self, client_id: &str, packet_id: u16) {
        tracing::debug!(client_id, packet_id, "message acked");
    }
}
