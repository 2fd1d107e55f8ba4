use std::collections::VecDeque;

use mqtt_core::message::Message;
use mqtt_core::qos::QoS;

use crate::packet_id::PacketIdAllocator;

/// One send-order entry: the packet id assigned at delivery time and the
/// message it was assigned to, kept so a retransmit can rebuild the exact same
/// PUBLISH with `dup=true`.
#[derive(Debug, Clone)]
struct InflightEntry {
    packet_id: u16,
    message: Message,
}

/// A freshly prepared outbound PUBLISH, ready for the transport to encode.
#[derive(Debug, Clone)]
pub struct OutboundPublish {
    pub message: Message,
    pub qos: QoS,
    pub packet_id: Option<u16>,
    pub dup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acked,
    UnknownPacketId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetransmitOutcome {
    /// Timer fired for a packet id no longer awaiting ack; stale, ignore.
    Stale,
    /// The expected invariant "awaiting_ack has a matching inflight entry" did
    /// not hold; logged by the caller as an inconsistency.
    MissingInflightEntry,
}

/// Inflight queue, awaiting-ack set, and packet-id allocation for QoS-1 egress.
/// `awaiting_ack` is represented here as a plain set of ids — the
/// actual timer handles live with the transport/session event loop, which is
/// the only thing that can schedule `tokio::time` futures into its own
/// `select!`; this type only tracks which ids are still outstanding.
#[derive(Debug, Default)]
pub struct DeliveryEngine {
    allocator: PacketIdAllocator,
    inflight: VecDeque<InflightEntry>,
    awaiting_ack: std::collections::HashSet<u16>,
}

impl DeliveryEngine {
    pub fn new() -> Self {
        DeliveryEngine::default()
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_awaiting_ack(&self, packet_id: u16) -> bool {
        self.awaiting_ack.contains(&packet_id)
    }

    /// Computes effective delivery QoS per L3 (`min(degrade(msg.qos), sub_qos)`)
    /// and, for QoS 1, allocates a packet id and records the inflight entry.
    pub fn prepare_outbound(&mut self, message: Message, sub_qos: QoS) -> OutboundPublish {
        let effective_qos = message.qos.degrade().min(sub_qos);

        match effective_qos {
            QoS::AtMostOnce => OutboundPublish {
                message,
                qos: QoS::AtMostOnce,
                packet_id: None,
                dup: false,
            },
            QoS::AtLeastOnce | QoS::ExactlyOnce => {
                let packet_id = self.allocator.allocate();
                self.inflight.push_back(InflightEntry {
                    packet_id,
                    message: message.clone(),
                });
                self.awaiting_ack.insert(packet_id);
                OutboundPublish {
                    message,
                    qos: QoS::AtLeastOnce,
                    packet_id: Some(packet_id),
                    dup: false,
                }
            }
        }
    }

    /// Clears a PUBACK. An unknown id is reported back rather than panicked on,
    /// so the caller can log it as a warning instead of failing the session.
    pub fn ack(&mut self, packet_id: u16) -> AckOutcome {
        if !self.awaiting_ack.remove(&packet_id) {
            return AckOutcome::UnknownPacketId;
        }
        self.inflight.retain(|e| e.packet_id != packet_id);
        AckOutcome::Acked
    }

    /// Builds the retransmit PUBLISH for a timer fire, preserving the original
    /// packet id and setting `dup=true`. Returns `Err` with the reason the
    /// retransmit didn't happen rather than resending nothing silently.
    pub fn retransmit(&self, packet_id: u16) -> Result<OutboundPublish, RetransmitOutcome> {
        if !self.awaiting_ack.contains(&packet_id) {
            return Err(RetransmitOutcome::Stale);
        }
        let entry = self
            .inflight
            .iter()
            .find(|e| e.packet_id == packet_id)
            .ok_or(RetransmitOutcome::MissingInflightEntry)?;

        Ok(OutboundPublish {
            message: entry.message.clone(),
            qos: QoS::AtLeastOnce,
            packet_id: Some(packet_id),
            dup: true,
        })
    }
}
