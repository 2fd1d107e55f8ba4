//! Byte-level framing over a `TcpStream`: buffers inbound bytes until
//! `mqtt_packets::check` reports a complete frame, then hands it to
//! `mqtt_packets::parse`. Plain TCP only (see DESIGN.md for why TLS was
//! dropped).

use std::io;

use bytes::{Bytes, BytesMut};
use mqtt_core::error::Error as CodecError;
use mqtt_packets::{check, parse, ControlPacket, OutboundPacket};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

const READ_BUFFER_CAPACITY: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed packet: {0}")]
    Codec(#[from] CodecError),
}

pub struct Connection {
    stream: BufWriter<TcpStream>,
    read_buffer: BytesMut,
}

impl Connection {
    pub fn new(socket: TcpStream) -> Self {
        Connection {
            stream: BufWriter::new(socket),
            read_buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
        }
    }

    /// Reads one complete frame. `Ok(None)` means the peer closed the socket
    /// cleanly between frames (no bytes of a new packet pending).
    pub async fn read_packet(&mut self) -> Result<Option<ControlPacket>, ConnectionError> {
        loop {
            if let Some(packet) = self.try_parse()? {
                return Ok(Some(packet));
            }
            if 0 == self.stream.read_buf(&mut self.read_buffer).await? {
                if self.read_buffer.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed mid-frame").into());
            }
        }
    }

    fn try_parse(&mut self) -> Result<Option<ControlPacket>, ConnectionError> {
        let peek = Bytes::copy_from_slice(&self.read_buffer);
        match check(&peek) {
            Ok(frame_len) => {
                let mut frame = self.read_buffer.split_to(frame_len).freeze();
                Ok(Some(parse(&mut frame)?))
            }
            Err(CodecError::PacketIncomplete) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn write_packet(&mut self, packet: &OutboundPacket) -> Result<(), ConnectionError> {
        let encoded = packet.encode();
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
