use bytes::{Bytes, BytesMut};

use mqtt_core::codec::{Decoder, Encoder};
use mqtt_core::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAckFlags {
    pub session_present: bool,
}

impl Decoder for ConnAckFlags {
    fn decode(buf: &mut Bytes) -> Result<Self, Error> {
        let byte = u8::decode(buf)?;
        if byte & 0xFE != 0 {
            return Err(Error::MalformedPacket("CONNACK flags reserved bits set"));
        }
        Ok(ConnAckFlags {
            session_present: byte & 0x01 != 0,
        })
    }
}

impl Encoder for ConnAckFlags {
    fn encode(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&[self.session_present as u8]);
    }
}

/// CONNACK return codes defined for MQTT 3.1.1 (§3.2.2.3). `BadCredentials` covers
/// both the "bad user name or password" and "not authorized" cases this core
/// distinguishes at the session layer but reports identically on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted = 0,
    UnacceptableProtocolVersion = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadCredentials = 4,
    NotAuthorized = 5,
}

impl ConnectReturnCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl Encoder for ConnectReturnCode {
    fn encode(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&[self.as_byte()]);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnAckPacket {
    pub flags: ConnAckFlags,
    pub return_code: ConnectReturnCode,
}

impl ConnAckPacket {
    pub fn new(session_present: bool, return_code: ConnectReturnCode) -> Self {
        ConnAckPacket {
            flags: ConnAckFlags { session_present },
            return_code,
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut body = BytesMut::new();
        self.flags.encode(&mut body);
        self.return_code.encode(&mut body);

        let mut out = BytesMut::with_capacity(body.len() + 2);
        out.extend_from_slice(&[0x20, body.len() as u8]);
        out.extend_from_slice(&body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_accepted_connack() {
        let packet = ConnAckPacket::new(false, ConnectReturnCode::Accepted);
        let bytes = packet.encode();
        assert_eq!(&bytes[..], &[0x20, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn encodes_session_present_bit() {
        let packet = ConnAckPacket::new(true, ConnectReturnCode::Accepted);
        let bytes = packet.encode();
        assert_eq!(&bytes[..], &[0x20, 0x02, 0x01, 0x00]);
    }
}
