//! The zero-payload packet types: PINGREQ, PINGRESP, DISCONNECT. Each is just a
//! fixed header with remaining length 0.

use bytes::BytesMut;

#[derive(Debug, Clone, Copy)]
pub struct PingReqPacket;

#[derive(Debug, Clone, Copy)]
pub struct PingRespPacket;

impl PingRespPacket {
    pub fn encode(&self) -> BytesMut {
        BytesMut::from(&[0xD0, 0x00][..])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisconnectPacket;
