use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("packet incomplete")]
    PacketIncomplete,

    #[error("malformed variable byte integer")]
    MalformedVarInt,

    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("unsupported protocol version {0}")]
    UnsupportedProtocolVersion(u8),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
