//! UDP header (RFC 768).

use pnet::packet::udp::{MutableUdpPacket, UdpPacket};

use super::extend_zeroed;

pub const HEADER_LEN: usize = 8;

/// Offset of the checksum field.
pub(crate) const CHECKSUM_OFFSET: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Udp {
    pub source_port: u16,
    pub destination_port: u16,
    /// Header plus payload length.
    pub length: u16,
    /// Zero means the sender did not compute one (IPv4 only).
    pub checksum: u16,
}

impl Udp {
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = UdpPacket::new(data)?;
        Some(Self {
            source_port: packet.get_source(),
            destination_port: packet.get_destination(),
            length: packet.get_length(),
            checksum: packet.get_checksum(),
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if let Some(mut packet) = MutableUdpPacket::new(extend_zeroed(out, HEADER_LEN)) {
            packet.set_source(self.source_port);
            packet.set_destination(self.destination_port);
            packet.set_length(self.length);
            packet.set_checksum(self.checksum);
        }
    }
}
