use mqtt_core::topic::TopicValidationError;

/// Errors that propagate out of the session to the transport adapter. Every
/// variant here closes the connection once surfaced; the transport decides
/// whether to emit a CONNACK first (for the connect-time variants) before
/// tearing down.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("CONNECT received on an already-connected session")]
    BadConnect,

    #[error("packet received before CONNECT was accepted")]
    NotConnected,

    #[error("invalid topic: {0}")]
    BadTopic(#[from] TopicValidationError),

    #[error("SUBSCRIBE or UNSUBSCRIBE with an empty topic list")]
    EmptyTopics,

    #[error("QoS 2 is not supported by this broker")]
    QoS2Unsupported,

    #[error("unacceptable protocol version")]
    UnacceptableProtocolVersion,

    #[error("client identifier rejected")]
    IdentifierRejected,

    #[error("bad user name or password")]
    BadCredentials,
}

pub type Result<T> = std::result::Result<T, SessionError>;
