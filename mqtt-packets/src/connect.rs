use bytes::{Bytes, BytesMut};

use mqtt_core::codec::{decode_binary, Decoder, Encoder};
use mqtt_core::error::Error;
use mqtt_core::protocol::ProtocolVersion;
use mqtt_core::qos::QoS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlags {
    pub user_name: bool,
    pub password: bool,
    pub will_retain: bool,
    pub will_qos: QoS,
    pub will_flag: bool,
    pub clean_start: bool,
}

impl Decoder for ConnectFlags {
    fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        let byte = u8::decode(buf)?;
        if byte & 0x01 != 0 {
            return Err(Error::MalformedPacket("CONNECT flags reserved bit set"));
        }
        let will_qos = QoS::from_byte((byte >> 3) & 0x03)?;
        let will_flag = (byte >> 2) & 0x01 != 0;
        if !will_flag && will_qos != QoS::AtMostOnce {
            return Err(Error::MalformedPacket("will QoS set without will flag"));
        }
        Ok(ConnectFlags {
            user_name: (byte >> 7) & 0x01 != 0,
            password: (byte >> 6) & 0x01 != 0,
            will_retain: (byte >> 5) & 0x01 != 0,
            will_qos,
            will_flag,
            clean_start: (byte >> 1) & 0x01 != 0,
        })
    }
}

impl Encoder for ConnectFlags {
    fn encode(&self, buf: &mut BytesMut) {
        let mut byte = 0u8;
        byte |= (self.user_name as u8) << 7;
        byte |= (self.password as u8) << 6;
        byte |= (self.will_retain as u8) << 5;
        byte |= self.will_qos.as_byte() << 3;
        byte |= (self.will_flag as u8) << 2;
        byte |= (self.clean_start as u8) << 1;
        buf.extend_from_slice(&[byte]);
    }
}

#[derive(Debug, Clone)]
pub struct ConnectPayload {
    pub client_id: String,
    pub will_topic: Option<String>,
    pub will_payload: Option<Bytes>,
    pub user_name: Option<String>,
    pub password: Option<Bytes>,
}

/// CONNECT carries its protocol name/level through unvalidated: whether the pair
/// names a version this broker accepts is a session-level decision (it has to be
/// answered with a CONNACK, not a dropped connection), not a codec one.
#[derive(Debug, Clone)]
pub struct ConnectPacket {
    pub protocol_name: String,
    pub protocol_level: u8,
    pub flags: ConnectFlags,
    pub keep_alive: u16,
    pub payload: ConnectPayload,
}

impl ConnectPacket {
    pub fn parse(buf: &mut Bytes) -> Result<Self, Error> {
        let protocol_name = String::decode(buf)?;
        let protocol_level = u8::decode(buf)?;

        let flags = ConnectFlags::decode(buf)?;
        let keep_alive = u16::decode(buf)?;

        let client_id = String::decode(buf)?;

        let (will_topic, will_payload) = if flags.will_flag {
            let topic = String::decode(buf)?;
            let payload = decode_binary(buf)?;
            (Some(topic), Some(payload))
        } else {
            (None, None)
        };

        let user_name = if flags.user_name {
            Some(String::decode(buf)?)
        } else {
            None
        };

        let password = if flags.password {
            Some(decode_binary(buf)?)
        } else {
            None
        };

        Ok(ConnectPacket {
            protocol_name,
            protocol_level,
            flags,
            keep_alive,
            payload: ConnectPayload {
                client_id,
                will_topic,
                will_payload,
                user_name,
                password,
            },
        })
    }

    /// Resolves the wire protocol name/level pair to a recognized version, if any.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::from_name_and_level(&self.protocol_name, self.protocol_level)
    }
}
