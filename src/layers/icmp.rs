//! ICMP and ICMPv6 header.
//!
//! Both protocols share the same four leading fields, so one struct serves
//! both; [`Layer`](super::Layer) tells them apart.

use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpType, MutableIcmpPacket};
use pnet::packet::Packet;

use super::extend_zeroed;

pub const HEADER_LEN: usize = 8;

/// Offset of the checksum field.
pub(crate) const CHECKSUM_OFFSET: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmp {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    /// Type-specific word, e.g. identifier and sequence of an echo.
    pub rest_of_header: [u8; 4],
}

impl Icmp {
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = IcmpPacket::new(data.get(..HEADER_LEN)?)?;
        let mut rest_of_header = [0u8; 4];
        rest_of_header.copy_from_slice(packet.payload());
        Some(Self {
            icmp_type: packet.get_icmp_type().0,
            code: packet.get_icmp_code().0,
            checksum: packet.get_checksum(),
            rest_of_header,
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if let Some(mut packet) = MutableIcmpPacket::new(extend_zeroed(out, HEADER_LEN)) {
            packet.set_icmp_type(IcmpType::new(self.icmp_type));
            packet.set_icmp_code(IcmpCode::new(self.code));
            packet.set_checksum(self.checksum);
            packet.set_payload(&self.rest_of_header);
        }
    }
}
