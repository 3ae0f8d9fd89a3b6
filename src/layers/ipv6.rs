//! IPv6 fixed header (RFC 8200).

use std::net::Ipv6Addr;

use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv6::{Ipv6Packet, MutableIpv6Packet};

use super::extend_zeroed;

pub const HEADER_LEN: usize = 40;

/// IPv6 fixed header. Extension headers are not decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6 {
    pub version: u8,
    pub traffic_class: u8,
    /// 20-bit flow label.
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
}

impl Ipv6 {
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = Ipv6Packet::new(data)?;
        if packet.get_version() != 6 {
            return None;
        }
        Some(Self {
            version: packet.get_version(),
            traffic_class: packet.get_traffic_class(),
            flow_label: packet.get_flow_label(),
            payload_length: packet.get_payload_length(),
            next_header: packet.get_next_header().0,
            hop_limit: packet.get_hop_limit(),
            source: packet.get_source(),
            destination: packet.get_destination(),
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if let Some(mut packet) = MutableIpv6Packet::new(extend_zeroed(out, HEADER_LEN)) {
            packet.set_version(self.version & 0x0f);
            packet.set_traffic_class(self.traffic_class);
            packet.set_flow_label(self.flow_label & 0x000f_ffff);
            packet.set_payload_length(self.payload_length);
            packet.set_next_header(IpNextHeaderProtocol::new(self.next_header));
            packet.set_hop_limit(self.hop_limit);
            packet.set_source(self.source);
            packet.set_destination(self.destination);
        }
    }
}
