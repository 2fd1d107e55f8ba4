use bytes::{Buf, Bytes, BytesMut};

use mqtt_core::codec::{encode_var_byte_integer, Decoder, Encoder};
use mqtt_core::error::Error;

#[derive(Debug, Clone)]
pub struct UnsubscribePacket {
    pub packet_id: u16,
    pub filters: Vec<String>,
}

impl UnsubscribePacket {
    pub fn parse(buf: &mut Bytes) -> Result<Self, Error> {
        let packet_id = u16::decode(buf)?;
        let mut filters = Vec::new();
        while buf.has_remaining() {
            filters.push(String::decode(buf)?);
        }
        if filters.is_empty() {
            return Err(Error::MalformedPacket("UNSUBSCRIBE with no topic filters"));
        }
        Ok(UnsubscribePacket { packet_id, filters })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UnsubAckPacket {
    pub packet_id: u16,
}

impl UnsubAckPacket {
    pub fn encode(&self) -> BytesMut {
        let mut body = BytesMut::new();
        self.packet_id.encode(&mut body);

        let mut out = BytesMut::new();
        out.extend_from_slice(&[0xB0]);
        encode_var_byte_integer(body.len() as u32, &mut out);
        out.extend_from_slice(&body);
        out
    }
}
