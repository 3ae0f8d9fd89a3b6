//! Ethernet II header.

use macaddr::MacAddr6;
use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};

use super::{extend_zeroed, from_pnet_mac, to_pnet_mac};

/// Length of the Ethernet II header.
pub const HEADER_LEN: usize = 14;

/// EtherType values of the network layers we decode.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const IPV6: u16 = 0x86dd;
}

/// Ethernet II header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ethernet {
    pub destination: MacAddr6,
    pub source: MacAddr6,
    pub ethertype: u16,
}

impl Ethernet {
    /// Decode the header at the start of `data`.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = EthernetPacket::new(data)?;
        Some(Self {
            destination: from_pnet_mac(packet.get_destination()),
            source: from_pnet_mac(packet.get_source()),
            ethertype: packet.get_ethertype().0,
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if let Some(mut packet) = MutableEthernetPacket::new(extend_zeroed(out, HEADER_LEN)) {
            packet.set_destination(to_pnet_mac(self.destination));
            packet.set_source(to_pnet_mac(self.source));
            packet.set_ethertype(EtherType::new(self.ethertype));
        }
    }
}
