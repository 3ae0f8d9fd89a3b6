//! Internet checksums over `pnet` packet views, plus the RFC 1624
//! incremental update for checksums in bytes that were not decoded.
//!
//! The computing helpers skip the checksum field of the data they are
//! given, so it may still hold the old value. The `verify_*` helpers sum
//! every word, stored checksum included.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::packet::icmp::{self, IcmpPacket};
use pnet::packet::icmpv6::{self, Icmpv6Packet};
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{self, Ipv4Packet};
use pnet::packet::tcp::{self, TcpPacket};
use pnet::packet::udp::{self, UdpPacket};
use pnet::packet::util;

use crate::layers::ip_protocol;

/// Word index no buffer reaches; nothing is skipped.
const NO_SKIP: usize = usize::MAX;

/// One's-complement checksum of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    util::checksum(data, NO_SKIP)
}

/// IPv4 header checksum; the checksum field is skipped.
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    match Ipv4Packet::new(header) {
        Some(packet) => ipv4::checksum(&packet),
        None => util::checksum(header, 5),
    }
}

/// True when a header including its checksum sums to all ones.
pub fn verify_ipv4_header(header: &[u8]) -> bool {
    !header.is_empty() && checksum(header) == 0
}

/// ICMPv4 checksum over the message in `data`.
pub fn icmp_checksum(data: &[u8]) -> u16 {
    match IcmpPacket::new(data) {
        Some(packet) => icmp::checksum(&packet),
        None => util::checksum(data, 1),
    }
}

/// Addresses of the IP layer a transport checksum is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoHeader {
    V4 { source: Ipv4Addr, destination: Ipv4Addr },
    V6 { source: Ipv6Addr, destination: Ipv6Addr },
}

impl PseudoHeader {
    /// Pseudo-header for a pair of addresses of the same family.
    pub fn new(source: IpAddr, destination: IpAddr) -> Option<Self> {
        match (source, destination) {
            (IpAddr::V4(source), IpAddr::V4(destination)) => {
                Some(PseudoHeader::V4 { source, destination })
            }
            (IpAddr::V6(source), IpAddr::V6(destination)) => {
                Some(PseudoHeader::V6 { source, destination })
            }
            _ => None,
        }
    }

    /// Checksum of `data` carried as `protocol`, skipping word `skipword`.
    fn checksum(&self, data: &[u8], skipword: usize, protocol: u8) -> u16 {
        let protocol = IpNextHeaderProtocol::new(protocol);
        match self {
            PseudoHeader::V4 { source, destination } => {
                util::ipv4_checksum(data, skipword, &[], source, destination, protocol)
            }
            PseudoHeader::V6 { source, destination } => {
                util::ipv6_checksum(data, skipword, &[], source, destination, protocol)
            }
        }
    }
}

/// Index of the checksum word in a segment of `protocol`.
fn checksum_word(protocol: u8) -> usize {
    match protocol {
        ip_protocol::TCP => 8,
        ip_protocol::UDP => 3,
        ip_protocol::ICMP | ip_protocol::ICMPV6 => 1,
        _ => NO_SKIP,
    }
}

/// Checksum of a TCP, UDP or ICMPv6 segment.
pub fn transport_checksum(pseudo: &PseudoHeader, protocol: u8, segment: &[u8]) -> u16 {
    let value = match (protocol, *pseudo) {
        (ip_protocol::TCP, PseudoHeader::V4 { source, destination }) => {
            TcpPacket::new(segment)
                .map(|packet| tcp::ipv4_checksum(&packet, &source, &destination))
        }
        (ip_protocol::TCP, PseudoHeader::V6 { source, destination }) => {
            TcpPacket::new(segment)
                .map(|packet| tcp::ipv6_checksum(&packet, &source, &destination))
        }
        (ip_protocol::UDP, PseudoHeader::V4 { source, destination }) => {
            UdpPacket::new(segment)
                .map(|packet| udp::ipv4_checksum(&packet, &source, &destination))
        }
        (ip_protocol::UDP, PseudoHeader::V6 { source, destination }) => {
            UdpPacket::new(segment)
                .map(|packet| udp::ipv6_checksum(&packet, &source, &destination))
        }
        (ip_protocol::ICMPV6, PseudoHeader::V6 { source, destination }) => {
            Icmpv6Packet::new(segment)
                .map(|packet| icmpv6::checksum(&packet, &source, &destination))
        }
        _ => None,
    };
    value.unwrap_or_else(|| pseudo.checksum(segment, checksum_word(protocol), protocol))
}

/// UDP checksum as transmitted: a computed zero goes out as all ones, since
/// zero on the wire means "no checksum".
pub fn udp_checksum(pseudo: &PseudoHeader, segment: &[u8]) -> u16 {
    match transport_checksum(pseudo, ip_protocol::UDP, segment) {
        0 => 0xffff,
        value => value,
    }
}

/// True when a segment that still carries its checksum verifies.
pub fn verify_transport(pseudo: &PseudoHeader, protocol: u8, segment: &[u8]) -> bool {
    pseudo.checksum(segment, NO_SKIP, protocol) == 0
}

/// Update `checksum` for covered bytes that changed from `old` to `new`
/// (RFC 1624, eqn. 3). Both slices must hold the same number of words.
pub fn update(checksum: u16, old: &[u8], new: &[u8]) -> u16 {
    let mut sum = u32::from(!checksum);
    for word in old.chunks(2) {
        sum += u32::from(!be_word(word));
    }
    for word in new.chunks(2) {
        sum += u32::from(be_word(word));
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn be_word(word: &[u8]) -> u16 {
    match word {
        [high, low] => u16::from_be_bytes([*high, *low]),
        [high] => u16::from_be_bytes([*high, 0]),
        _ => 0,
    }
}
