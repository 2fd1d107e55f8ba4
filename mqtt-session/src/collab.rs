//! Contracts for the external collaborators the session consumes: router,
//! ACL backend, auth backend, client registry, hooks. This crate only depends
//! on the trait surface; `mqtt-broker` supplies the reference implementations.

use mqtt_core::message::Message;
use mqtt_core::qos::QoS;
use mqtt_packets::OutboundPacket;
use tokio::sync::{mpsc, oneshot};

/// A message pushed to a session, tagged with the granted QoS of the
/// particular subscription filter that matched it. A single sink is shared
/// across every filter a session subscribes to (the router can't otherwise
/// tell the session which of its subscriptions fired), so the granted QoS
/// has to travel with the message rather than be looked up afterward by
/// the published topic — a wildcard filter's granted QoS has no relation to
/// the concrete topic a message was published on.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: Message,
    pub qos: QoS,
}

pub type DeliverySink = mpsc::UnboundedSender<Delivery>;

/// A scoped handle to the transport's unary packet sink: the session calls
/// `send` once per outbound packet and never waits on it. Backpressure and
/// actually writing bytes to the socket are the transport's problem.
pub type PacketSink = mpsc::UnboundedSender<OutboundPacket>;

pub trait Router: Send + Sync {
    fn subscribe(&self, filter: &str, client_id: &str, qos: QoS, sink: DeliverySink);
    fn unsubscribe(&self, filter: &str, client_id: &str);
    fn set_qos(&self, filter: &str, client_id: &str, qos: QoS);
    fn publish(&self, message: Message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclAction {
    Publish,
    Subscribe,
}

pub trait AclBackend: Send + Sync {
    fn check(&self, client_id: &str, username: Option<&str>, action: AclAction, topic: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    BadCredentials,
}

pub trait AuthBackend: Send + Sync {
    fn authenticate(&self, client_id: &str, username: Option<&str>, password: Option<&[u8]>) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Conflict,
}

/// Client-id registry: registering a client id may asynchronously deliver a
/// `Conflict` shutdown to whichever session previously held it. The session
/// does not wait on this synchronously; the transport adapter owning the
/// connection polls the returned receiver as one more branch of its event loop.
pub trait Registry: Send + Sync {
    fn register(&self, client_id: &str) -> oneshot::Receiver<ShutdownReason>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientDisconnect,
    SocketError,
    Conflict,
    ProtocolError,
}

#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub filter: String,
    pub qos: QoS,
}

pub trait Hooks: Send + Sync {
    fn client_connected(&self, client_id: &str, return_code: u8) {
        let _ = (client_id, return_code);
    }

    fn client_subscribe(&self, client_id: &str, table: Vec<SubscribeRequest>) -> Vec<SubscribeRequest> {
        let _ = client_id;
        table
    }

    fn client_subscribed(&self, client_id: &str, filter: &str, qos: QoS) {
        let _ = (client_id, filter, qos);
    }

    fn client_unsubscribe(&self, client_id: &str, filters: &[String]) {
        let _ = (client_id, filters);
    }

    fn client_disconnected(&self, client_id: &str, reason: DisconnectReason) {
        let _ = (client_id, reason);
    }

    fn message_acked(&self, client_id: &str, packet_id: u16) {
        let _ = (client_id, packet_id);
    }
}

/// No-op collaborator set, useful for unit tests that only want to exercise one
/// code path without wiring a full reference broker.
pub struct NoopHooks;
impl Hooks for NoopHooks {}

pub struct AllowAllAcl;
impl AclBackend for AllowAllAcl {
    fn check(&self, _client_id: &str, _username: Option<&str>, _action: AclAction, _topic: &str) -> bool {
        true
    }
}

pub struct AllowAnonymousAuth;
impl AuthBackend for AllowAnonymousAuth {
    fn authenticate(&self, _client_id: &str, _username: Option<&str>, _password: Option<&[u8]>) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Router that accepts subscribe/publish calls and does nothing; used by tests
/// that drive the session's own state machine without caring about fan-out.
pub struct NoopRouter;
impl Router for NoopRouter {
    fn subscribe(&self, _filter: &str, _client_id: &str, _qos: QoS, _sink: DeliverySink) {}
    fn unsubscribe(&self, _filter: &str, _client_id: &str) {}
    fn set_qos(&self, _filter: &str, _client_id: &str, _qos: QoS) {}
    fn publish(&self, _message: Message) {}
}

/// Assigns a client id to a CONNECT that arrived with an empty one (3.1.1 only;
/// 3.1 always rejects an empty client id, see `SessionError::IdentifierRejected`).
pub trait ClientIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Fixed-id generator, useful for tests that need a predictable assigned id.
pub struct FixedClientIdGenerator(pub String);
impl ClientIdGenerator for FixedClientIdGenerator {
    fn generate(&self) -> String {
        self.0.clone()
    }
}
