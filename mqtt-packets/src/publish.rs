use bytes::{Bytes, BytesMut};

use mqtt_core::codec::{encode_var_byte_integer, Decoder, Encoder};
use mqtt_core::error::Error;
use mqtt_core::qos::QoS;

#[derive(Debug, Clone)]
pub struct PublishPacket {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic_name: String,
    /// `None` for QoS 0, `Some` for QoS 1.
    pub packet_id: Option<u16>,
    pub payload: Bytes,
}

impl PublishPacket {
    pub fn parse(flags: u8, buf: &mut Bytes) -> Result<Self, Error> {
        let dup = (flags >> 3) & 0x01 != 0;
        let qos = QoS::from_byte((flags >> 1) & 0x03)?;
        let retain = flags & 0x01 != 0;

        if qos == QoS::AtMostOnce && dup {
            return Err(Error::MalformedPacket("DUP set on QoS 0 PUBLISH"));
        }

        let topic_name = String::decode(buf)?;
        // QoS 1 and QoS 2 both carry a packet id on the wire; whether QoS 2 is
        // accepted at all is a session-level decision (`SessionError::QoS2Unsupported`),
        // not a codec one, so the byte is still consumed here.
        let packet_id = if qos != QoS::AtMostOnce {
            Some(u16::decode(buf)?)
        } else {
            None
        };

        let payload = buf.clone();

        Ok(PublishPacket {
            dup,
            qos,
            retain,
            topic_name,
            packet_id,
            payload,
        })
    }

    pub fn encode(&self) -> BytesMut {
        let mut body = BytesMut::new();
        self.topic_name.clone().encode(&mut body);
        if let Some(pid) = self.packet_id {
            pid.encode(&mut body);
        }
        body.extend_from_slice(&self.payload);

        let first_byte = 0x30
            | ((self.dup as u8) << 3)
            | (self.qos.as_byte() << 1)
            | (self.retain as u8);

        let mut out = BytesMut::new();
        out.extend_from_slice(&[first_byte]);
        encode_var_byte_integer(body.len() as u32, &mut out);
        out.extend_from_slice(&body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_qos0_publish_without_packet_id() {
        let mut body = BytesMut::new();
        "a/b".to_string().encode(&mut body);
        body.extend_from_slice(b"payload");
        let mut bytes = body.freeze();

        let packet = PublishPacket::parse(0b0000, &mut bytes).unwrap();
        assert_eq!(packet.qos, QoS::AtMostOnce);
        assert!(packet.packet_id.is_none());
        assert_eq!(packet.topic_name, "a/b");
        assert_eq!(&packet.payload[..], b"payload");
    }

    #[test]
    fn parses_qos1_publish_with_packet_id() {
        let mut body = BytesMut::new();
        "a/b".to_string().encode(&mut body);
        42u16.encode(&mut body);
        body.extend_from_slice(b"x");
        let mut bytes = body.freeze();

        let packet = PublishPacket::parse(0b0010, &mut bytes).unwrap();
        assert_eq!(packet.qos, QoS::AtLeastOnce);
        assert_eq!(packet.packet_id, Some(42));
    }

    #[test]
    fn qos2_decodes_with_packet_id_rejection_is_a_session_concern() {
        // The codec has no opinion on QoS 2; it decodes the packet id like any
        // other acked QoS so the session can reject it with a typed error.
        let mut body = BytesMut::new();
        "a/b".to_string().encode(&mut body);
        9u16.encode(&mut body);
        let mut bytes = body.freeze();
        let packet = PublishPacket::parse(0b0100, &mut bytes).unwrap();
        assert_eq!(packet.qos, QoS::ExactlyOnce);
        assert_eq!(packet.packet_id, Some(9));
    }

    #[test]
    fn encode_sets_dup_and_retain_bits() {
        let packet = PublishPacket {
            dup: true,
            qos: QoS::AtLeastOnce,
            retain: true,
            topic_name: "t".into(),
            packet_id: Some(7),
            payload: Bytes::from_static(b"x"),
        };
        let encoded = packet.encode();
        assert_eq!(encoded[0], 0b0011_1011);
    }
}
