//! The per-connection state machine. One `Session` is owned by exactly
//! one task; every method takes `&mut self` and runs to completion before the
//! next event is processed — there is no internal lock to take because nothing
//! else ever touches these fields.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use mqtt_core::message::Message;
use mqtt_core::protocol::ProtocolVersion;
use mqtt_core::qos::QoS;
use mqtt_packets::{
    ConnAckPacket, ConnectPacket, ConnectReturnCode, ControlPacket, OutboundPacket, PingRespPacket,
    PubAckPacket, PublishPacket, SubAckPacket, SubAckReturnCode, SubscribePacket, UnsubAckPacket,
    UnsubscribePacket,
};
use tokio::sync::{mpsc, oneshot};

use crate::acl_cache::AclCache;
use crate::collab::{
    AclAction, AclBackend, AuthBackend, AuthError, ClientIdGenerator, Delivery, DeliverySink,
    DisconnectReason, Hooks, PacketSink, Registry, Router, ShutdownReason, SubscribeRequest,
};
use crate::delivery::DeliveryEngine;
use crate::error::{Result, SessionError};
use crate::keepalive::{arm_interval, DEFAULT_KEEPALIVE_FACTOR};
use crate::subscriptions::{SubscribeOutcome, SubscriptionTable};
use crate::validator::{validate_publish, validate_subscribe, validate_unsubscribe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FsmState {
    AwaitingConnect,
    Connected,
    Terminated,
}

/// A retransmit timer fire, the only timer kind the core owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutEvent {
    AwaitingAck { packet_id: u16 },
}

/// What the transport adapter must additionally schedule as a result of the
/// event it just fed the session. Packet writes are not part of this — those
/// already went out over the `PacketSink` by the time a method returns.
#[derive(Debug)]
pub enum SessionOutcome {
    None,
    /// CONNECT was accepted. The transport should arm the keepalive deadline
    /// (if any) and start polling `shutdown_rx` for a takeover `Conflict`.
    Connected {
        keepalive_interval: Option<Duration>,
        shutdown_rx: oneshot::Receiver<ShutdownReason>,
    },
}

/// Outcome of feeding the session a router-pushed message via `deliver`.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Sent at QoS 0; nothing further to track.
    Sent,
    /// Sent at QoS 1; the transport should arm a retransmit timer for
    /// `packet_id` that fires `timeout(AwaitingAck{packet_id})` after `after`.
    SentWithRetransmitTimer { packet_id: u16, after: Duration },
}

/// Construction-time options, not reachable in
/// later sessions since the session is re-created per connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_client_id_len: usize,
    pub retry_interval_seconds: u64,
    pub keepalive_factor: f64,
    pub cache_acl: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_client_id_len: 1024,
            retry_interval_seconds: 30,
            keepalive_factor: DEFAULT_KEEPALIVE_FACTOR,
            cache_acl: true,
        }
    }
}

/// The collaborators a session needs injected at construction.
pub struct SessionCollaborators {
    pub router: Arc<dyn Router>,
    pub acl: Arc<dyn AclBackend>,
    pub auth: Arc<dyn AuthBackend>,
    pub registry: Arc<dyn Registry>,
    pub hooks: Arc<dyn Hooks>,
    pub client_ids: Arc<dyn ClientIdGenerator>,
}

pub struct Session {
    peer_address: String,
    send: PacketSink,
    config: SessionConfig,
    collab: SessionCollaborators,

    state: FsmState,
    client_id: String,
    clean_session: bool,
    proto_ver: Option<ProtocolVersion>,
    username: Option<String>,
    will: Option<Message>,
    keepalive_seconds: u16,
    connected_at: Option<SystemTime>,
    ws_initial_headers: Vec<(String, String)>,

    subscriptions: SubscriptionTable,
    delivery: DeliveryEngine,
    acl_cache: AclCache,

    delivery_tx: DeliverySink,
    delivery_rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Session {
    pub fn new(
        peer_address: String,
        send: PacketSink,
        config: SessionConfig,
        collab: SessionCollaborators,
    ) -> Self {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let cache_acl = config.cache_acl;
        Session {
            peer_address,
            send,
            config,
            collab,
            state: FsmState::AwaitingConnect,
            client_id: String::new(),
            clean_session: false,
            proto_ver: None,
            username: None,
            will: None,
            keepalive_seconds: 0,
            connected_at: None,
            ws_initial_headers: Vec::new(),
            subscriptions: SubscriptionTable::new(),
            delivery: DeliveryEngine::new(),
            acl_cache: AclCache::new(cache_acl),
            delivery_tx,
            delivery_rx,
        }
    }

    pub fn peer_address(&self) -> &str {
        &self.peer_address
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_connected(&self) -> bool {
        self.state == FsmState::Connected
    }

    pub fn is_terminated(&self) -> bool {
        self.state == FsmState::Terminated
    }

    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.proto_ver
    }

    pub fn connected_at(&self) -> Option<SystemTime> {
        self.connected_at
    }

    /// The channel the transport should poll alongside inbound packets once
    /// the session is connected; the router delivers to it via the sink handed
    /// out at subscribe time.
    pub fn delivery_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<Delivery> {
        &mut self.delivery_rx
    }

    fn send_packet(&self, packet: OutboundPacket) {
        let _ = self.send.send(packet);
    }

    /// Processes one inbound packet.
    pub fn receive(&mut self, packet: ControlPacket) -> Result<SessionOutcome> {
        match self.state {
            FsmState::AwaitingConnect => {
                if !matches!(packet, ControlPacket::Connect(_)) {
                    return Err(SessionError::NotConnected);
                }
            }
            FsmState::Connected => {
                if matches!(packet, ControlPacket::Connect(_)) {
                    return Err(SessionError::BadConnect);
                }
            }
            FsmState::Terminated => return Err(SessionError::NotConnected),
        }

        match packet {
            ControlPacket::Connect(connect) => self.handle_connect(connect),
            ControlPacket::Publish(publish) => self.handle_publish(publish).map(|()| SessionOutcome::None),
            ControlPacket::PubAck(puback) => {
                self.handle_puback(puback);
                Ok(SessionOutcome::None)
            }
            ControlPacket::Subscribe(subscribe) => {
                self.handle_subscribe(subscribe).map(|()| SessionOutcome::None)
            }
            ControlPacket::Unsubscribe(unsubscribe) => {
                self.handle_unsubscribe(unsubscribe).map(|()| SessionOutcome::None)
            }
            ControlPacket::PingReq(_) => {
                self.send_packet(OutboundPacket::PingResp(PingRespPacket));
                Ok(SessionOutcome::None)
            }
            ControlPacket::Disconnect(_) => {
                self.will = None;
                self.state = FsmState::Terminated;
                Ok(SessionOutcome::None)
            }
        }
    }

    fn handle_connect(&mut self, connect: ConnectPacket) -> Result<SessionOutcome> {
        let Some(proto_ver) = connect.protocol_version() else {
            self.send_packet(OutboundPacket::ConnAck(ConnAckPacket::new(
                false,
                ConnectReturnCode::UnacceptableProtocolVersion,
            )));
            return Err(SessionError::UnacceptableProtocolVersion);
        };

        let raw_client_id = connect.payload.client_id.clone();
        let client_id = if raw_client_id.is_empty() {
            // MQTT 3.1 predates auto-assigned client ids; only 3.1.1 may leave
            // it empty, and only when clean_start asks to discard prior state.
            if proto_ver != ProtocolVersion::V3_1_1 || !connect.flags.clean_start {
                self.send_packet(OutboundPacket::ConnAck(ConnAckPacket::new(
                    false,
                    ConnectReturnCode::IdentifierRejected,
                )));
                return Err(SessionError::IdentifierRejected);
            }
            self.collab.client_ids.generate()
        } else if raw_client_id.len() > self.config.max_client_id_len {
            self.send_packet(OutboundPacket::ConnAck(ConnAckPacket::new(
                false,
                ConnectReturnCode::IdentifierRejected,
            )));
            return Err(SessionError::IdentifierRejected);
        } else {
            raw_client_id
        };

        let auth_result = self.collab.auth.authenticate(
            &client_id,
            connect.payload.user_name.as_deref(),
            connect.payload.password.as_deref(),
        );
        if let Err(AuthError::BadCredentials) = auth_result {
            self.send_packet(OutboundPacket::ConnAck(ConnAckPacket::new(
                false,
                ConnectReturnCode::BadCredentials,
            )));
            return Err(SessionError::BadCredentials);
        }

        self.proto_ver = Some(proto_ver);
        self.client_id = client_id.clone();
        self.clean_session = connect.flags.clean_start;
        self.username = connect.payload.user_name.clone();
        self.keepalive_seconds = connect.keep_alive;
        self.will = connect.flags.will_flag.then(|| {
            Message::new(
                connect.payload.will_topic.clone().unwrap_or_default(),
                connect.payload.will_payload.clone().unwrap_or_default(),
                connect.flags.will_qos,
                connect.flags.will_retain,
            )
        });
        self.connected_at = Some(SystemTime::now());
        self.state = FsmState::Connected;

        let shutdown_rx = self.collab.registry.register(&client_id);
        let keepalive_interval = arm_interval(self.keepalive_seconds, self.config.keepalive_factor);

        self.collab
            .hooks
            .client_connected(&client_id, ConnectReturnCode::Accepted.as_byte());
        self.send_packet(OutboundPacket::ConnAck(ConnAckPacket::new(
            false,
            ConnectReturnCode::Accepted,
        )));

        Ok(SessionOutcome::Connected {
            keepalive_interval,
            shutdown_rx,
        })
    }

    fn handle_publish(&mut self, publish: PublishPacket) -> Result<()> {
        if publish.qos == QoS::ExactlyOnce {
            return Err(SessionError::QoS2Unsupported);
        }
        validate_publish(&publish.topic_name)?;

        let client_id = self.client_id.clone();
        let username = self.username.clone();
        let acl = Arc::clone(&self.collab.acl);
        let topic = publish.topic_name.clone();
        let allowed = self.acl_cache.get_or_check(&topic, || {
            acl.check(&client_id, username.as_deref(), AclAction::Publish, &topic)
        });

        if !allowed {
            tracing::debug!(client_id = %self.client_id, topic = %publish.topic_name, "publish denied by ACL");
            return Ok(());
        }

        let message = Message::new(
            publish.topic_name.clone(),
            publish.payload.clone(),
            publish.qos,
            publish.retain,
        );
        self.collab.router.publish(message);

        if publish.qos == QoS::AtLeastOnce {
            if let Some(packet_id) = publish.packet_id {
                self.send_packet(OutboundPacket::PubAck(PubAckPacket { packet_id }));
            }
        }

        Ok(())
    }

    fn handle_puback(&mut self, puback: PubAckPacket) {
        use crate::delivery::AckOutcome;

        match self.delivery.ack(puback.packet_id) {
            AckOutcome::Acked => {
                self.collab.hooks.message_acked(&self.client_id, puback.packet_id);
            }
            AckOutcome::UnknownPacketId => {
                tracing::warn!(client_id = %self.client_id, packet_id = puback.packet_id, "PUBACK for unknown packet id");
            }
        }
    }

    fn handle_subscribe(&mut self, subscribe: SubscribePacket) -> Result<()> {
        let filters: Vec<String> = subscribe.topics.iter().map(|t| t.filter.clone()).collect();
        validate_subscribe(&filters)?;

        let requested: Vec<SubscribeRequest> = subscribe
            .topics
            .iter()
            .map(|t| SubscribeRequest { filter: t.filter.clone(), qos: t.qos })
            .collect();
        let table = self.collab.hooks.client_subscribe(&self.client_id, requested);

        let username = self.username.clone();
        let any_denied = table.iter().any(|req| {
            !self
                .collab
                .acl
                .check(&self.client_id, username.as_deref(), AclAction::Subscribe, &req.filter)
        });

        if any_denied {
            let return_codes = table.iter().map(|_| SubAckReturnCode::Failure).collect();
            self.send_packet(OutboundPacket::SubAck(SubAckPacket {
                packet_id: subscribe.packet_id,
                return_codes,
            }));
            return Ok(());
        }

        let mut return_codes = Vec::with_capacity(table.len());
        for req in &table {
            let granted_qos = req.qos.degrade();
            match self.subscriptions.subscribe(&req.filter, granted_qos) {
                SubscribeOutcome::Installed(qos) => {
                    self.collab.router.subscribe(
                        &req.filter,
                        &self.client_id,
                        qos,
                        self.delivery_tx.clone(),
                    );
                    self.collab.hooks.client_subscribed(&self.client_id, &req.filter, qos);
                }
                SubscribeOutcome::AlreadyAtQos(qos) => {
                    tracing::debug!(client_id = %self.client_id, filter = %req.filter, ?qos, "duplicate subscribe, same QoS");
                }
                SubscribeOutcome::QosChanged { to, .. } => {
                    self.collab.router.set_qos(&req.filter, &self.client_id, to);
                }
            }
            return_codes.push(SubAckReturnCode::from_granted_qos(granted_qos));
        }

        self.send_packet(OutboundPacket::SubAck(SubAckPacket {
            packet_id: subscribe.packet_id,
            return_codes,
        }));

        Ok(())
    }

    fn handle_unsubscribe(&mut self, unsubscribe: UnsubscribePacket) -> Result<()> {
        validate_unsubscribe(&unsubscribe.filters)?;

        self.collab
            .hooks
            .client_unsubscribe(&self.client_id, &unsubscribe.filters);

        for filter in &unsubscribe.filters {
            if self.subscriptions.unsubscribe(filter) {
                self.collab.router.unsubscribe(filter, &self.client_id);
            }
        }

        self.send_packet(OutboundPacket::UnsubAck(UnsubAckPacket {
            packet_id: unsubscribe.packet_id,
        }));

        Ok(())
    }

    /// Delivers a message the router pushed to this session, tagged with the
    /// granted QoS of whichever subscription filter matched it (the router
    /// computed that match; a wildcard filter's granted QoS has no relation
    /// to the published topic, so it cannot be recovered from the topic alone).
    pub fn deliver(&mut self, delivery: Delivery) -> DeliveryOutcome {
        let Delivery { message, qos: sub_qos } = delivery;
        let outbound = self.delivery.prepare_outbound(message, sub_qos);

        let packet = PublishPacket {
            dup: outbound.dup,
            qos: outbound.qos,
            retain: outbound.message.retain,
            topic_name: outbound.message.topic.to_string(),
            packet_id: outbound.packet_id,
            payload: outbound.message.payload,
        };
        self.send_packet(OutboundPacket::Publish(packet));

        match outbound.packet_id {
            Some(packet_id) => DeliveryOutcome::SentWithRetransmitTimer {
                packet_id,
                after: Duration::from_secs(self.config.retry_interval_seconds),
            },
            None => DeliveryOutcome::Sent,
        }
    }

    /// Handles a timer fire. Returns the interval to
    /// re-arm the same timer at, or `None` if the fire was stale/inconsistent.
    pub fn timeout(&mut self, event: TimeoutEvent) -> Option<Duration> {
        let TimeoutEvent::AwaitingAck { packet_id } = event;

        match self.delivery.retransmit(packet_id) {
            Ok(outbound) => {
                let packet = PublishPacket {
                    dup: outbound.dup,
                    qos: outbound.qos,
                    retain: outbound.message.retain,
                    topic_name: outbound.message.topic.to_string(),
                    packet_id: outbound.packet_id,
                    payload: outbound.message.payload,
                };
                self.send_packet(OutboundPacket::Publish(packet));
                Some(Duration::from_secs(self.config.retry_interval_seconds))
            }
            Err(outcome) => {
                tracing::debug!(client_id = %self.client_id, packet_id, ?outcome, "retransmit timer fired with no effect");
                None
            }
        }
    }

    /// Terminates the session. Emits the will unless this is a
    /// takeover (`Conflict`, the replacement session owns will semantics) or no
    /// client id was ever assigned.
    pub fn shutdown(&mut self, reason: DisconnectReason) {
        self.state = FsmState::Terminated;

        if let Some(will) = self.will.take() {
            if reason != DisconnectReason::Conflict && !self.client_id.is_empty() {
                self.collab.router.publish(will);
            }
        }

        if !self.client_id.is_empty() {
            self.collab.hooks.client_disconnected(&self.client_id, reason);
        }
    }

    pub fn with_ws_initial_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.ws_initial_headers = headers;
        self
    }

    pub fn ws_initial_headers(&self) -> &[(String, String)] {
        &self.ws_initial_headers
    }
}
