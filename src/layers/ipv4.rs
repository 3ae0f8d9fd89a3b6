//! IPv4 header (RFC 791).

use std::net::Ipv4Addr;

use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{Ipv4Packet, MutableIpv4Packet};

use super::extend_zeroed;

/// Header length without options.
pub const MIN_HEADER_LEN: usize = 20;

const FLAG_MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

/// IPv4 header; `options` keeps the option bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4 {
    pub version: u8,
    /// Header length in 32-bit words (IHL).
    pub header_len: u8,
    /// DSCP (top 6 bits) and ECN.
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    /// Flags (top 3 bits) and fragment offset.
    pub flags_fragment: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub options: Vec<u8>,
}

impl Ipv4 {
    /// Decode the header at the start of `data`.
    ///
    /// Returns `None` unless the version is 4 and the declared header
    /// length is at least 20 bytes and fits in `data`.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = Ipv4Packet::new(data)?;
        let header_len = packet.get_header_length();
        let header_bytes = header_len as usize * 4;
        if packet.get_version() != 4 || header_bytes < MIN_HEADER_LEN || header_bytes > data.len()
        {
            return None;
        }

        Some(Self {
            version: packet.get_version(),
            header_len,
            tos: (packet.get_dscp() << 2) | packet.get_ecn(),
            total_length: packet.get_total_length(),
            identification: packet.get_identification(),
            flags_fragment: (u16::from(packet.get_flags()) << 13) | packet.get_fragment_offset(),
            ttl: packet.get_ttl(),
            protocol: packet.get_next_level_protocol().0,
            checksum: packet.get_checksum(),
            source: packet.get_source(),
            destination: packet.get_destination(),
            options: packet.get_options_raw().to_vec(),
        })
    }

    /// Encoded size of the header, options included.
    pub fn header_bytes(&self) -> usize {
        MIN_HEADER_LEN + self.options.len()
    }

    /// True for any fragment but a whole datagram.
    pub fn is_fragment(&self) -> bool {
        self.flags_fragment & (FLAG_MORE_FRAGMENTS | FRAGMENT_OFFSET_MASK) != 0
    }

    /// Offset of this fragment in 8-byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.flags_fragment & FRAGMENT_OFFSET_MASK
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let buf = extend_zeroed(out, self.header_bytes());
        buf[MIN_HEADER_LEN..].copy_from_slice(&self.options);
        if let Some(mut packet) = MutableIpv4Packet::new(buf) {
            packet.set_version(self.version);
            packet.set_header_length(self.header_len);
            packet.set_dscp(self.tos >> 2);
            packet.set_ecn(self.tos & 0x03);
            packet.set_total_length(self.total_length);
            packet.set_identification(self.identification);
            packet.set_flags((self.flags_fragment >> 13) as u8);
            packet.set_fragment_offset(self.flags_fragment & FRAGMENT_OFFSET_MASK);
            packet.set_ttl(self.ttl);
            packet.set_next_level_protocol(IpNextHeaderProtocol::new(self.protocol));
            packet.set_checksum(self.checksum);
            packet.set_source(self.source);
            packet.set_destination(self.destination);
        }
    }

    /// Pad options to a 32-bit boundary and make IHL match them.
    pub(crate) fn sync_header_len(&mut self) {
        while self.options.len() % 4 != 0 {
            self.options.push(0);
        }
        self.header_len = (self.header_bytes() / 4) as u8;
    }
}
