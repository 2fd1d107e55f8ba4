//! Integration tests driving `mqttd::server` over real TCP sockets, covering
//! the literal end-to-end scenarios of the broker's CONNECT/SUBSCRIBE/PUBLISH
//! handling.

use std::sync::Arc;
use std::time::Duration;

use mqtt_broker::{AllowAll, AllowAnonymous, ClientRegistry, GuidGenerator, LoggingHooks, MemoryRouter};
use mqtt_core::message::Message;
use mqtt_core::qos::QoS;
use mqtt_session::collab::{AclAction, AclBackend};
use mqtt_session::SessionConfig;
use mqttd::server::{run, Broker};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Denies subscribing to one specific filter; everything else (including all
/// publishes) is allowed. Exists only to exercise the SUBSCRIBE all-deny path.
#[derive(Debug, Default)]
struct DenySubscribeTo {
    denied_filter: String,
}

impl AclBackend for DenySubscribeTo {
    fn check(&self, _client_id: &str, _username: Option<&str>, action: AclAction, topic: &str) -> bool {
        match action {
            AclAction::Subscribe => topic != self.denied_filter,
            AclAction::Publish => true,
        }
    }
}

async fn spawn_broker() -> (std::net::SocketAddr, Arc<Broker>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = Arc::new(Broker {
        router: Arc::new(MemoryRouter::new()),
        acl: Arc::new(AllowAll),
        auth: Arc::new(AllowAnonymous),
        registry: Arc::new(ClientRegistry::new()),
        hooks: Arc::new(LoggingHooks),
        client_ids: Arc::new(GuidGenerator::new()),
    });

    let server_broker = Arc::clone(&broker);
    let handle = tokio::spawn(async move {
        run(listener, server_broker, SessionConfig::default(), std::future::pending::<()>()).await;
    });

    (addr, broker, handle)
}

fn connect_frame(client_id: &str, clean_start: bool, protocol_level: u8, keep_alive: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&4u16.to_be_bytes());
    body.extend_from_slice(b"MQTT");
    body.push(protocol_level);
    body.push((clean_start as u8) << 1);
    body.extend_from_slice(&keep_alive.to_be_bytes());
    body.extend_from_slice(&(client_id.len() as u16).to_be_bytes());
    body.extend_from_slice(client_id.as_bytes());

    let mut frame = vec![0x10];
    encode_remaining_length(body.len(), &mut frame);
    frame.extend_from_slice(&body);
    frame
}

fn subscribe_frame(packet_id: u16, filter: &str, qos: u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&packet_id.to_be_bytes());
    body.extend_from_slice(&(filter.len() as u16).to_be_bytes());
    body.extend_from_slice(filter.as_bytes());
    body.push(qos);

    let mut frame = vec![0x82];
    encode_remaining_length(body.len(), &mut frame);
    frame.extend_from_slice(&body);
    frame
}

fn puback_frame(packet_id: u16) -> Vec<u8> {
    let mut frame = vec![0x40, 0x02];
    frame.extend_from_slice(&packet_id.to_be_bytes());
    frame
}

fn disconnect_frame() -> Vec<u8> {
    vec![0xE0, 0x00]
}

fn encode_remaining_length(mut len: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
}

async fn read_exact_n(socket: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    socket.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn scenario_1_accept() {
    let (addr, _broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("c1", true, 4, 60)).await.unwrap();
    let connack = read_exact_n(&mut socket, 4).await;
    assert_eq!(connack, [0x20, 0x02, 0x00, 0x00]);
}

#[tokio::test]
async fn scenario_2_reject_bad_protocol_version() {
    let (addr, _broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("c1", true, 5, 60)).await.unwrap();
    let connack = read_exact_n(&mut socket, 4).await;
    assert_eq!(connack, [0x20, 0x02, 0x00, 0x01]);

    // The session does not progress past AwaitingConnect; the socket closes.
    let mut buf = [0u8; 1];
    let n = socket.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn scenario_3_empty_client_id_311_clean_start() {
    let (addr, _broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("", true, 4, 60)).await.unwrap();
    let connack = read_exact_n(&mut socket, 4).await;
    assert_eq!(connack, [0x20, 0x02, 0x00, 0x00]);
}

#[tokio::test]
async fn scenario_4_empty_client_id_clean_false_is_rejected() {
    let (addr, _broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("", false, 4, 60)).await.unwrap();
    let connack = read_exact_n(&mut socket, 4).await;
    assert_eq!(connack, [0x20, 0x02, 0x00, 0x02]);
}

#[tokio::test]
async fn scenario_8_subscribe_all_deny_when_acl_denies_one_filter() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let broker = Arc::new(Broker {
        router: Arc::new(MemoryRouter::new()),
        acl: Arc::new(DenySubscribeTo {
            denied_filter: "denied/topic".to_string(),
        }),
        auth: Arc::new(AllowAnonymous),
        registry: Arc::new(ClientRegistry::new()),
        hooks: Arc::new(LoggingHooks),
        client_ids: Arc::new(GuidGenerator::new()),
    });

    tokio::spawn(run(listener, broker, SessionConfig::default(), std::future::pending::<()>()));

    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(&connect_frame("c1", true, 4, 60)).await.unwrap();
    let _connack = read_exact_n(&mut socket, 4).await;

    let mut subscribe_body = Vec::new();
    subscribe_body.extend_from_slice(&1u16.to_be_bytes());
    for filter in ["allowed/topic", "denied/topic"] {
        subscribe_body.extend_from_slice(&(filter.len() as u16).to_be_bytes());
        subscribe_body.extend_from_slice(filter.as_bytes());
        subscribe_body.push(0);
    }
    let mut frame = vec![0x82];
    encode_remaining_length(subscribe_body.len(), &mut frame);
    frame.extend_from_slice(&subscribe_body);
    socket.write_all(&frame).await.unwrap();

    let suback = read_exact_n(&mut socket, 6).await;
    assert_eq!(suback, [0x90, 0x04, 0x00, 0x01, 0x80, 0x80]);
}

#[tokio::test]
async fn scenario_5_qos1_round_trip_via_router_delivery() {
    let (addr, broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("c1", true, 4, 60)).await.unwrap();
    let _connack = read_exact_n(&mut socket, 4).await;

    socket.write_all(&subscribe_frame(1, "a/b", 1)).await.unwrap();
    let _suback = read_exact_n(&mut socket, 5).await;

    broker
        .router
        .publish(Message::new("a/b", &b"hello"[..], QoS::AtLeastOnce, false));

    // PUBLISH{qos=1, dup=false, pid=1, topic="a/b", payload="hello"}
    let header = read_exact_n(&mut socket, 2).await;
    assert_eq!(header[0], 0x32); // PUBLISH, qos=1, dup=0, retain=0
    let remaining = header[1] as usize;
    let body = read_exact_n(&mut socket, remaining).await;
    assert_eq!(&body[0..2], &3u16.to_be_bytes());
    assert_eq!(&body[2..5], b"a/b");
    assert_eq!(&body[5..7], &1u16.to_be_bytes());
    assert_eq!(&body[7..], b"hello");

    socket.write_all(&puback_frame(1)).await.unwrap();
}

#[tokio::test]
async fn scenario_10_disconnect_terminates_without_will() {
    let (addr, _broker, _handle) = spawn_broker().await;
    let mut socket = TcpStream::connect(addr).await.unwrap();

    socket.write_all(&connect_frame("c1", true, 4, 60)).await.unwrap();
    let _connack = read_exact_n(&mut socket, 4).await;

    socket.write_all(&disconnect_frame()).await.unwrap();

    let mut buf = [0u8; 1];
    tokio::time::timeout(Duration::from_secs(1), socket.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
}
