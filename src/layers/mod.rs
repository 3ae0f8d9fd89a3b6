//! Typed protocol layers and the layer stack.
//!
//! Every layer is an owned value struct with public fields. A frame decodes
//! into a [`LayerStack`]; mutating fields and calling
//! [`LayerStack::encode`] produces wire bytes with consistent lengths and
//! checksums.

mod arp;
mod ethernet;
mod icmp;
mod ipv4;
mod ipv6;
mod stack;
mod tcp;
mod udp;

pub use arp::{Arp, OPERATION_REPLY, OPERATION_REQUEST};
pub use ethernet::{ethertype, Ethernet};
pub use icmp::Icmp;
pub use ipv4::Ipv4;
pub use ipv6::Ipv6;
pub use stack::LayerStack;
pub use tcp::{flags as tcp_flags, Tcp};
pub use udp::Udp;

pub(crate) use ethernet::HEADER_LEN as ETHERNET_HEADER_LEN;
pub(crate) use udp::HEADER_LEN as UDP_HEADER_LEN;

use std::net::IpAddr;

use macaddr::MacAddr6;
use pnet::util::MacAddr;

/// IP protocol numbers of the transport layers we decode.
pub mod ip_protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ICMPV6: u8 = 58;
}

/// One decoded protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Ethernet(Ethernet),
    Arp(Arp),
    Ipv4(Ipv4),
    Ipv6(Ipv6),
    Tcp(Tcp),
    Udp(Udp),
    Icmpv4(Icmp),
    Icmpv6(Icmp),
    /// Bytes that were not decoded further.
    Opaque(Vec<u8>),
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Ethernet(_) => "Ethernet",
            Layer::Arp(_) => "ARP",
            Layer::Ipv4(_) => "IPv4",
            Layer::Ipv6(_) => "IPv6",
            Layer::Tcp(_) => "TCP",
            Layer::Udp(_) => "UDP",
            Layer::Icmpv4(_) => "ICMPv4",
            Layer::Icmpv6(_) => "ICMPv6",
            Layer::Opaque(_) => "Opaque",
        }
    }

    /// Number of bytes [`Layer::write`] emits.
    pub fn encoded_len(&self) -> usize {
        match self {
            Layer::Ethernet(eth) => eth.header_len(),
            Layer::Arp(arp) => arp.header_len(),
            Layer::Ipv4(ip) => ip.header_bytes(),
            Layer::Ipv6(ip) => ip.header_len(),
            Layer::Tcp(tcp) => tcp.header_len(),
            Layer::Udp(udp) => udp.header_len(),
            Layer::Icmpv4(icmp) | Layer::Icmpv6(icmp) => icmp.header_len(),
            Layer::Opaque(bytes) => bytes.len(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Layer::Ethernet(eth) => eth.write(out),
            Layer::Arp(arp) => arp.write(out),
            Layer::Ipv4(ip) => ip.write(out),
            Layer::Ipv6(ip) => ip.write(out),
            Layer::Tcp(tcp) => tcp.write(out),
            Layer::Udp(udp) => udp.write(out),
            Layer::Icmpv4(icmp) | Layer::Icmpv6(icmp) => icmp.write(out),
            Layer::Opaque(bytes) => out.extend_from_slice(bytes),
        }
    }

    /// Source and destination of an IP layer.
    pub fn ip_addresses(&self) -> Option<(IpAddr, IpAddr)> {
        match self {
            Layer::Ipv4(ip) => Some((IpAddr::V4(ip.source), IpAddr::V4(ip.destination))),
            Layer::Ipv6(ip) => Some((IpAddr::V6(ip.source), IpAddr::V6(ip.destination))),
            _ => None,
        }
    }

    pub(crate) fn set_checksum(&mut self, value: u16) {
        match self {
            Layer::Ipv4(ip) => ip.checksum = value,
            Layer::Tcp(tcp) => tcp.checksum = value,
            Layer::Udp(udp) => udp.checksum = value,
            Layer::Icmpv4(icmp) | Layer::Icmpv6(icmp) => icmp.checksum = value,
            _ => {}
        }
    }

    /// Equality of everything except the checksum field.
    pub(crate) fn same_content(&self, other: &Layer) -> bool {
        let mut left = self.clone();
        let mut right = other.clone();
        left.set_checksum(0);
        right.set_checksum(0);
        left == right
    }

    pub(crate) fn same_kind(&self, other: &Layer) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Grow `out` by `len` zero bytes and hand them back for a
/// `Mutable*Packet` view.
pub(crate) fn extend_zeroed(out: &mut Vec<u8>, len: usize) -> &mut [u8] {
    let start = out.len();
    out.resize(start + len, 0);
    &mut out[start..]
}

pub(crate) fn from_pnet_mac(mac: MacAddr) -> MacAddr6 {
    MacAddr6::from(mac.octets())
}

pub(crate) fn to_pnet_mac(mac: MacAddr6) -> MacAddr {
    MacAddr::from(mac.into_array())
}
