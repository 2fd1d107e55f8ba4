use bytes::{Buf, Bytes, BytesMut};

use mqtt_core::codec::{encode_var_byte_integer, Decoder, Encoder};
use mqtt_core::error::Error;
use mqtt_core::qos::QoS;

#[derive(Debug, Clone)]
pub struct SubscribeTopic {
    pub filter: String,
    pub qos: QoS,
}

#[derive(Debug, Clone)]
pub struct SubscribePacket {
    pub packet_id: u16,
    pub topics: Vec<SubscribeTopic>,
}

impl SubscribePacket {
    pub fn parse(buf: &mut Bytes) -> Result<Self, Error> {
        let packet_id = u16::decode(buf)?;
        let mut topics = Vec::new();
        while buf.has_remaining() {
            let filter = String::decode(buf)?;
            let qos_byte = u8::decode(buf)?;
            if qos_byte & 0xFC != 0 {
                return Err(Error::MalformedPacket("SUBSCRIBE QoS byte reserved bits set"));
            }
            let qos = QoS::from_byte(qos_byte)?;
            topics.push(SubscribeTopic { filter, qos });
        }
        if topics.is_empty() {
            return Err(Error::MalformedPacket("SUBSCRIBE with no topic filters"));
        }
        Ok(SubscribePacket { packet_id, topics })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubAckReturnCode {
    MaxQoS0,
    MaxQoS1,
    Failure,
}

impl SubAckReturnCode {
    pub fn from_granted_qos(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => SubAckReturnCode::MaxQoS0,
            QoS::AtLeastOnce | QoS::ExactlyOnce => SubAckReturnCode::MaxQoS1,
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            SubAckReturnCode::MaxQoS0 => 0x00,
            SubAckReturnCode::MaxQoS1 => 0x01,
            SubAckReturnCode::Failure => 0x80,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubAckPacket {
    pub packet_id: u16,
    pub return_codes: Vec<SubAckReturnCode>,
}

impl SubAckPacket {
    pub fn encode(&self) -> BytesMut {
        let mut body = BytesMut::new();
        self.packet_id.encode(&mut body);
        for rc in &self.return_codes {
            body.extend_from_slice(&[rc.as_byte()]);
        }

        let mut out = BytesMut::new();
        out.extend_from_slice(&[0x90]);
        encode_var_byte_integer(body.len() as u32, &mut out);
        out.extend_from_slice(&body);
        out
    }
}
