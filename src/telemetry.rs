// Packet classification and the outbound publication seam

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::framing::codec::{ORIENTATION_RATE_ID, RAW_RATE_ID};
use crate::messages::Outbound;

/// Telemetry packet type, selected by the first byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Elapsed time + angular rates, feeds the quaternion error
    OrientationRate,
    /// Unfiltered gyro rates
    RawRate,
    Unknown(u8),
}

impl PacketKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            ORIENTATION_RATE_ID => PacketKind::OrientationRate,
            RAW_RATE_ID => PacketKind::RawRate,
            other => PacketKind::Unknown(other),
        }
    }

    /// Classify a whole packet; an empty packet is unknown
    pub fn of(packet: &[u8]) -> Self {
        packet
            .first()
            .map_or(PacketKind::Unknown(0), |&tag| Self::from_tag(tag))
    }

    pub fn is_recognized(self) -> bool {
        !matches!(self, PacketKind::Unknown(_))
    }
}

/// One scalar value for one outbound channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Publication {
    pub channel: Outbound,
    pub value: f32,
}

/// Where the poll loop sends its values
pub trait TelemetrySink: Send + Sync {
    fn publish(&self, channel: Outbound, value: f32);
}

/// Hands publications to the async forwarder that owns the bus publishers
impl TelemetrySink for UnboundedSender<Publication> {
    fn publish(&self, channel: Outbound, value: f32) {
        if self.send(Publication { channel, value }).is_err() {
            debug!("Publication on {:?} dropped, forwarder gone", channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_kind_from_tag() {
        assert_eq!(PacketKind::from_tag(1), PacketKind::OrientationRate);
        assert_eq!(PacketKind::from_tag(2), PacketKind::RawRate);
        assert_eq!(PacketKind::from_tag(0), PacketKind::Unknown(0));
        assert_eq!(PacketKind::from_tag(9), PacketKind::Unknown(9));
        assert!(!PacketKind::of(&[]).is_recognized());
        assert!(PacketKind::of(&[2, 0, 0]).is_recognized());
    }

    #[test]
    fn test_channel_sink_forwards_until_closed() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.publish(Outbound::Wx, 1.5);
        assert_eq!(
            rx.try_recv().unwrap(),
            Publication {
                channel: Outbound::Wx,
                value: 1.5
            }
        );

        drop(rx);
        // Must not panic once the forwarder is gone
        tx.publish(Outbound::Wy, 2.0);
    }
}
