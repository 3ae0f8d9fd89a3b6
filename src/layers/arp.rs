//! ARP packet (RFC 826) for Ethernet hardware and IPv4 protocol addresses.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;
use pnet::packet::arp::{ArpHardwareType, ArpOperation, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::EtherType;

use super::{extend_zeroed, from_pnet_mac, to_pnet_mac};

/// Size of an Ethernet/IPv4 ARP packet.
pub const HEADER_LEN: usize = 28;

const HW_ADDR_LEN: u8 = 6;
const PROTO_ADDR_LEN: u8 = 4;

pub const OPERATION_REQUEST: u16 = 1;
pub const OPERATION_REPLY: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arp {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub operation: u16,
    pub sender_hw_addr: MacAddr6,
    pub sender_proto_addr: Ipv4Addr,
    pub target_hw_addr: MacAddr6,
    pub target_proto_addr: Ipv4Addr,
}

impl Arp {
    /// Decode an ARP packet; bytes past the 28-byte body are not consumed.
    ///
    /// Packets whose declared address lengths are not 6 and 4 are left to
    /// the caller.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = ArpPacket::new(data)?;
        if packet.get_hw_addr_len() != HW_ADDR_LEN
            || packet.get_proto_addr_len() != PROTO_ADDR_LEN
        {
            return None;
        }
        Some(Self {
            hardware_type: packet.get_hardware_type().0,
            protocol_type: packet.get_protocol_type().0,
            operation: packet.get_operation().0,
            sender_hw_addr: from_pnet_mac(packet.get_sender_hw_addr()),
            sender_proto_addr: packet.get_sender_proto_addr(),
            target_hw_addr: from_pnet_mac(packet.get_target_hw_addr()),
            target_proto_addr: packet.get_target_proto_addr(),
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if let Some(mut packet) = MutableArpPacket::new(extend_zeroed(out, HEADER_LEN)) {
            packet.set_hardware_type(ArpHardwareType::new(self.hardware_type));
            packet.set_protocol_type(EtherType::new(self.protocol_type));
            packet.set_hw_addr_len(HW_ADDR_LEN);
            packet.set_proto_addr_len(PROTO_ADDR_LEN);
            packet.set_operation(ArpOperation::new(self.operation));
            packet.set_sender_hw_addr(to_pnet_mac(self.sender_hw_addr));
            packet.set_sender_proto_addr(self.sender_proto_addr);
            packet.set_target_hw_addr(to_pnet_mac(self.target_hw_addr));
            packet.set_target_proto_addr(self.target_proto_addr);
        }
    }
}
