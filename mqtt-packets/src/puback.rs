use bytes::{Bytes, BytesMut};

use mqtt_core::codec::Decoder;
use mqtt_core::error::Error;

#[derive(Debug, Clone, Copy)]
pub struct PubAckPacket {
    pub packet_id: u16,
}

impl PubAckPacket {
    pub fn parse(buf: &mut Bytes) -> Result<Self, Error> {
        Ok(PubAckPacket {
            packet_id: u16::decode(buf)?,
        })
    }

    pub fn encode(&self) -> BytesMut {
        let mut out = BytesMut::new();
        out.extend_from_slice(&[0x40, 0x02]);
        out.extend_from_slice(&self.packet_id.to_be_bytes());
        out
    }
}
