//! Accept loop and per-connection event loop: one event (inbound packet,
//! delivered message, timer fire, shutdown signal) handled at a time per
//! connection, over plain TCP, driving an `mqtt_session::Session`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use mqtt_broker::{AclBackend, AuthBackend, ClientIdGenerator, Hooks, Registry, Router};
use mqtt_packets::{ControlPacket, OutboundPacket};
use mqtt_session::collab::{DisconnectReason, ShutdownReason};
use mqtt_session::{Session, SessionCollaborators, SessionConfig, SessionOutcome, TimeoutEvent};

use crate::connection::{Connection, ConnectionError};

/// Bundles the collaborator implementations a freshly accepted connection's
/// `Session` is built from. One `Broker` is shared across every connection
/// for the process lifetime; `collaborators()` hands out a fresh set of Arc
/// clones per session, since `SessionCollaborators` is not itself `Clone`.
pub struct Broker {
    pub router: Arc<dyn Router>,
    pub acl: Arc<dyn AclBackend>,
    pub auth: Arc<dyn AuthBackend>,
    pub registry: Arc<dyn Registry>,
    pub hooks: Arc<dyn Hooks>,
    pub client_ids: Arc<dyn ClientIdGenerator>,
}

impl Broker {
    fn collaborators(&self) -> SessionCollaborators {
        SessionCollaborators {
            router: Arc::clone(&self.router),
            acl: Arc::clone(&self.acl),
            auth: Arc::clone(&self.auth),
            registry: Arc::clone(&self.registry),
            hooks: Arc::clone(&self.hooks),
            client_ids: Arc::clone(&self.client_ids),
        }
    }
}

/// Runs the accept loop until `shutdown` resolves. Connections already
/// in flight are not drained.
pub async fn run(listener: TcpListener, broker: Arc<Broker>, session_config: SessionConfig, shutdown: impl Future) {
    tokio::select! {
        _ = accept_loop(listener, broker, session_config) => {}
        _ = shutdown => {
            tracing::info!("shutting down");
        }
    }
}

async fn accept_loop(listener: TcpListener, broker: Arc<Broker>, session_config: SessionConfig) {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                let broker = Arc::clone(&broker);
                let session_config = session_config.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(socket, peer_addr, broker, session_config).await {
                        tracing::warn!(%peer_addr, %err, "connection closed with an error");
                    }
                });
            }
            Err(err) => {
                tracing::error!(%err, "failed to accept connection");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum HandlerError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

async fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    broker: Arc<Broker>,
    session_config: SessionConfig,
) -> Result<(), HandlerError> {
    let mut connection = Connection::new(socket);
    let (packet_tx, mut packet_rx) = mpsc::unbounded_channel::<OutboundPacket>();
    let mut session = Session::new(
        peer_addr.to_string(),
        packet_tx,
        session_config,
        broker.collaborators(),
    );

    let Some(first_packet) = connection.read_packet().await? else {
        return Ok(());
    };
    tracing::info!(packet = ?first_packet, "received inbound packet");

    // In `AwaitingConnect`, anything other than CONNECT is a protocol
    // error the transport surfaces by closing; `Session::receive` already
    // enforces this, so a non-CONNECT first packet falls into the generic
    // error path below instead of a special case here.
    let outcome = session.receive(first_packet);
    drain_outbound(&mut connection, &mut packet_rx).await?;

    let (keepalive_interval, shutdown_rx) = match outcome {
        Ok(SessionOutcome::Connected { keepalive_interval, shutdown_rx }) => (keepalive_interval, shutdown_rx),
        Ok(SessionOutcome::None) => {
            tracing::warn!(%peer_addr, "first packet produced no session outcome, closing");
            return Ok(());
        }
        Err(err) => {
            tracing::warn!(%peer_addr, %err, "CONNECT rejected");
            return Ok(());
        }
    };

    let reason = event_loop(&mut session, &mut connection, &mut packet_rx, shutdown_rx, keepalive_interval).await?;

    session.shutdown(reason);
    tracing::info!(%peer_addr, client_id = session.client_id(), ?reason, "session ended");
    Ok(())
}

/// Writes every packet the session has queued since the last drain, in the
/// order `Session::send_packet` enqueued them.
async fn drain_outbound(
    connection: &mut Connection,
    packet_rx: &mut mpsc::UnboundedReceiver<OutboundPacket>,
) -> Result<(), ConnectionError> {
    while let Ok(packet) = packet_rx.try_recv() {
        tracing::info!(packet = ?packet, "sending outbound packet");
        connection.write_packet(&packet).await?;
    }
    Ok(())
}

/// Spawns a one-shot timer that reports `TimeoutEvent::AwaitingAck` back into
/// the event loop's own mailbox, rather than invoking a callback concurrently
/// with packet handling.
fn spawn_retransmit_timer(timer_tx: mpsc::UnboundedSender<TimeoutEvent>, packet_id: u16, after: Duration) {
    tokio::spawn(async move {
        time::sleep(after).await;
        let _ = timer_tx.send(TimeoutEvent::AwaitingAck { packet_id });
    });
}

/// A keepalive deadline of `None` (keepalive disabled) is modeled as a very
/// distant sleep rather than branching the `select!` shape, mirroring the
/// teacher's `Duration::from_secs(u64::MAX / 2)` trick.
const KEEPALIVE_DISABLED: Duration = Duration::from_secs(u64::MAX / 2 / 1_000_000_000);

async fn event_loop(
    session: &mut Session,
    connection: &mut Connection,
    packet_rx: &mut mpsc::UnboundedReceiver<OutboundPacket>,
    mut shutdown_rx: oneshot::Receiver<ShutdownReason>,
    keepalive_interval: Option<Duration>,
) -> Result<DisconnectReason, ConnectionError> {
    let keepalive_interval = keepalive_interval.unwrap_or(KEEPALIVE_DISABLED);
    let keepalive_deadline = time::sleep(keepalive_interval);
    tokio::pin!(keepalive_deadline);

    let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<TimeoutEvent>();

    loop {
        tokio::select! {
            read_result = connection.read_packet() => {
                match read_result? {
                    None => return Ok(DisconnectReason::SocketError),
                    Some(ControlPacket::Disconnect(packet)) => {
                        tracing::info!(packet = ?packet, "received inbound packet");
                        let _ = session.receive(ControlPacket::Disconnect(packet));
                        drain_outbound(connection, packet_rx).await?;
                        return Ok(DisconnectReason::ClientDisconnect);
                    }
                    Some(packet) => {
                        tracing::info!(packet = ?packet, "received inbound packet");
                        keepalive_deadline.as_mut().reset(Instant::now() + keepalive_interval);
                        let result = session.receive(packet);
                        drain_outbound(connection, packet_rx).await?;
                        if result.is_err() {
                            return Ok(DisconnectReason::ProtocolError);
                        }
                    }
                }
            }

            Some(delivery) = session.delivery_receiver().recv() => {
                let outcome = session.deliver(delivery);
                if let mqtt_session::DeliveryOutcome::SentWithRetransmitTimer { packet_id, after } = outcome {
                    spawn_retransmit_timer(timer_tx.clone(), packet_id, after);
                }
                drain_outbound(connection, packet_rx).await?;
            }

            Some(event) = timer_rx.recv() => {
                if let Some(rearm_after) = session.timeout(event) {
                    let TimeoutEvent::AwaitingAck { packet_id } = event;
                    spawn_retransmit_timer(timer_tx.clone(), packet_id, rearm_after);
                }
                drain_outbound(connection, packet_rx).await?;
            }

            _ = &mut shutdown_rx => {
                return Ok(DisconnectReason::Conflict);
            }

            _ = &mut keepalive_deadline => {
                tracing::warn!(client_id = session.client_id(), "keepalive timeout");
                return Ok(DisconnectReason::SocketError);
            }
        }
    }
}
