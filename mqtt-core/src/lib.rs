pub mod codec;
pub mod error;
pub mod message;
pub mod protocol;
pub mod qos;
pub mod topic;

pub use error::{Error, Result};
pub use message::Message;
pub use protocol::ProtocolVersion;
pub use qos::QoS;
