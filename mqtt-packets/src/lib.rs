pub mod connack;
pub mod connect;
pub mod fixed_header;
pub mod puback;
pub mod publish;
pub mod simple;
pub mod subscribe;
pub mod unsubscribe;

use bytes::{Buf, Bytes, BytesMut};

use mqtt_core::error::Error;

pub use connack::{ConnAckFlags, ConnAckPacket, ConnectReturnCode};
pub use connect::{ConnectFlags, ConnectPacket, ConnectPayload};
pub use fixed_header::{check, PacketType};
pub use puback::PubAckPacket;
pub use publish::PublishPacket;
pub use simple::{DisconnectPacket, PingReqPacket, PingRespPacket};
pub use subscribe::{SubAckPacket, SubAckReturnCode, SubscribePacket, SubscribeTopic};
pub use unsubscribe::{UnsubAckPacket, UnsubscribePacket};

/// Every inbound packet type this broker accepts. Outbound-only types (CONNACK,
/// SUBACK, UNSUBACK, PUBACK, PINGRESP) are constructed directly by the session and
/// encoded without round-tripping through this enum.
#[derive(Debug, Clone)]
pub enum ControlPacket {
    Connect(ConnectPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    Subscribe(SubscribePacket),
    Unsubscribe(UnsubscribePacket),
    PingReq(PingReqPacket),
    Disconnect(DisconnectPacket),
}

/// Every packet type the session ever hands back to the transport for writing.
/// A single enum lets the connection handler treat "a response" and "a pushed
/// delivery" uniformly: one channel, one `encode()` call site.
#[derive(Debug, Clone)]
pub enum OutboundPacket {
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    SubAck(SubAckPacket),
    UnsubAck(UnsubAckPacket),
    PingResp(PingRespPacket),
}

impl OutboundPacket {
    pub fn encode(&self) -> BytesMut {
        match self {
            OutboundPacket::ConnAck(p) => p.encode(),
            OutboundPacket::Publish(p) => p.encode(),
            OutboundPacket::PubAck(p) => p.encode(),
            OutboundPacket::SubAck(p) => p.encode(),
            OutboundPacket::UnsubAck(p) => p.encode(),
            OutboundPacket::PingResp(p) => p.encode(),
        }
    }
}

/// Parses one complete frame out of `buf`, which must already contain at least as
/// many bytes as `fixed_header::check` reported. Mirrors the split between peeking
/// a frame boundary and parsing its contents that the transport loop relies on.
pub fn parse(buf: &mut Bytes) -> Result<ControlPacket, Error> {
    let header = fixed_header::parse_fixed_header(buf)?;
    buf.advance(header.header_len);

    let mut body = buf.split_to(header.remaining_length as usize);

    let packet = match header.packet_type {
        PacketType::Connect => ControlPacket::Connect(ConnectPacket::parse(&mut body)?),
        PacketType::Publish => ControlPacket::Publish(PublishPacket::parse(header.flags, &mut body)?),
        PacketType::PubAck => ControlPacket::PubAck(PubAckPacket::parse(&mut body)?),
        PacketType::Subscribe => ControlPacket::Subscribe(SubscribePacket::parse(&mut body)?),
        PacketType::Unsubscribe => ControlPacket::Unsubscribe(UnsubscribePacket::parse(&mut body)?),
        PacketType::PingReq => ControlPacket::PingReq(PingReqPacket),
        PacketType::Disconnect => ControlPacket::Disconnect(DisconnectPacket),
        PacketType::ConnAck | PacketType::SubAck | PacketType::UnsubAck | PacketType::PingResp => {
            return Err(Error::MalformedPacket("client sent a server-to-client-only packet type"))
        }
    };

    Ok(packet)
}
