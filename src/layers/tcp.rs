//! TCP header (RFC 9293).

use pnet::packet::tcp::{MutableTcpPacket, TcpPacket};

use super::extend_zeroed;

/// Header length without options.
pub const MIN_HEADER_LEN: usize = 20;

/// Offset of the checksum field.
pub(crate) const CHECKSUM_OFFSET: usize = 16;

/// Bits of the 12-bit flags field.
pub mod flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
}

/// TCP header; `options` keeps the option bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tcp {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgment: u32,
    /// Header length in 32-bit words.
    pub data_offset: u8,
    /// Reserved bits and flags, low 12 bits of bytes 12..14.
    pub flags: u16,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    pub options: Vec<u8>,
}

impl Tcp {
    pub fn decode(data: &[u8]) -> Option<Self> {
        let packet = TcpPacket::new(data)?;
        let data_offset = packet.get_data_offset();
        let header_bytes = data_offset as usize * 4;
        if header_bytes < MIN_HEADER_LEN || header_bytes > data.len() {
            return None;
        }

        Some(Self {
            source_port: packet.get_source(),
            destination_port: packet.get_destination(),
            sequence: packet.get_sequence(),
            acknowledgment: packet.get_acknowledgement(),
            data_offset,
            flags: (u16::from(packet.get_reserved()) << 8) | u16::from(packet.get_flags()),
            window: packet.get_window(),
            checksum: packet.get_checksum(),
            urgent_pointer: packet.get_urgent_ptr(),
            options: packet.get_options_raw().to_vec(),
        })
    }

    pub fn header_len(&self) -> usize {
        MIN_HEADER_LEN + self.options.len()
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let buf = extend_zeroed(out, self.header_len());
        buf[MIN_HEADER_LEN..].copy_from_slice(&self.options);
        if let Some(mut packet) = MutableTcpPacket::new(buf) {
            packet.set_source(self.source_port);
            packet.set_destination(self.destination_port);
            packet.set_sequence(self.sequence);
            packet.set_acknowledgement(self.acknowledgment);
            packet.set_data_offset(self.data_offset & 0x0f);
            packet.set_reserved(((self.flags >> 8) & 0x0f) as u8);
            packet.set_flags(self.flags as u8);
            packet.set_window(self.window);
            packet.set_checksum(self.checksum);
            packet.set_urgent_ptr(self.urgent_pointer);
        }
    }

    /// Pad options to a 32-bit boundary and make the data offset match them.
    pub(crate) fn sync_data_offset(&mut self) {
        while self.options.len() % 4 != 0 {
            self.options.push(0);
        }
        self.data_offset = (self.header_len() / 4) as u8;
    }
}
