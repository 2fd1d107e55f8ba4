use std::sync::Arc;

use bytes::Bytes;

use crate::qos::QoS;

/// A message in flight between the broker's router and a session — publisher-side
/// framing (packet id, dup) is attached by the session when it becomes an outbound
/// PUBLISH, not carried here.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: Arc<str>,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

impl Message {
    pub fn new(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>, qos: QoS, retain: bool) -> Self {
        Message {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        }
    }
}
