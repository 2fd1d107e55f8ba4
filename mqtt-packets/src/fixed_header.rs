use bytes::{Buf, Bytes};

use mqtt_core::codec::decode_var_byte_integer;
use mqtt_core::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Connect,
    ConnAck,
    Publish,
    PubAck,
    Subscribe,
    SubAck,
    Unsubscribe,
    UnsubAck,
    PingReq,
    PingResp,
    Disconnect,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::ConnAck),
            3 => Ok(PacketType::Publish),
            4 => Ok(PacketType::PubAck),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::SubAck),
            10 => Ok(PacketType::Unsubscribe),
            11 => Ok(PacketType::UnsubAck),
            12 => Ok(PacketType::PingReq),
            13 => Ok(PacketType::PingResp),
            14 => Ok(PacketType::Disconnect),
            5 | 6 | 7 => Err(Error::MalformedPacket("QoS 2 control packets are not supported")),
            other => Err(Error::MalformedPacket(match other {
                0 => "reserved packet type 0",
                15 => "reserved packet type 15",
                _ => "unknown packet type",
            })),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
    /// Total bytes the fixed header itself occupied (type+flags byte plus the
    /// variable-length remaining-length field).
    pub header_len: usize,
}

/// Peeks at `buf` to see whether a complete packet is available, without consuming
/// it. Called by the transport loop before it commits to reading a whole frame.
pub fn check(buf: &Bytes) -> Result<usize, Error> {
    let header = parse_fixed_header(buf)?;
    let total = header.header_len + header.remaining_length as usize;
    if buf.len() < total {
        return Err(Error::PacketIncomplete);
    }
    Ok(total)
}

pub fn parse_fixed_header(buf: &Bytes) -> Result<FixedHeader, Error> {
    if buf.is_empty() {
        return Err(Error::PacketIncomplete);
    }
    let first = buf[0];
    let packet_type = PacketType::try_from(first >> 4)?;
    let flags = first & 0x0F;

    let mut rest = buf.slice(1..);
    let vbi = decode_var_byte_integer(&mut rest)?;

    Ok(FixedHeader {
        packet_type,
        flags,
        remaining_length: vbi.value,
        header_len: 1 + vbi.encoded_len,
    })
}
