//! Global file header.

use std::fmt;

use pcap_file::pcap::PcapHeader;
use pcap_file::{DataLink, Endianness};

use super::DEFAULT_SNAPLEN;
use crate::error::FormatError;

const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;

/// Byte order of every multi-byte field in a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Byte order of the machine we run on.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}

impl From<Endianness> for ByteOrder {
    fn from(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Big => ByteOrder::Big,
            Endianness::Little => ByteOrder::Little,
        }
    }
}

impl From<ByteOrder> for Endianness {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Big => Endianness::Big,
            ByteOrder::Little => Endianness::Little,
        }
    }
}

/// Unit of the sub-second part of record timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsResolution {
    Micro,
    Nano,
}

impl From<pcap_file::TsResolution> for TsResolution {
    fn from(resolution: pcap_file::TsResolution) -> Self {
        match resolution {
            pcap_file::TsResolution::MicroSecond => TsResolution::Micro,
            pcap_file::TsResolution::NanoSecond => TsResolution::Nano,
        }
    }
}

impl From<TsResolution> for pcap_file::TsResolution {
    fn from(resolution: TsResolution) -> Self {
        match resolution {
            TsResolution::Micro => pcap_file::TsResolution::MicroSecond,
            TsResolution::Nano => pcap_file::TsResolution::NanoSecond,
        }
    }
}

/// Link-layer header type of the frames in a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkType(pub u32);

impl LinkType {
    /// IEEE 802.3 Ethernet.
    pub const ETHERNET: LinkType = LinkType(1);
    /// Raw IP, version taken from the first nibble.
    pub const RAW: LinkType = LinkType(101);
    /// Raw IPv4.
    pub const IPV4: LinkType = LinkType(228);
    /// Raw IPv6.
    pub const IPV6: LinkType = LinkType(229);
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LinkType::ETHERNET => write!(f, "ETHERNET"),
            LinkType::RAW => write!(f, "RAW"),
            LinkType::IPV4 => write!(f, "IPV4"),
            LinkType::IPV6 => write!(f, "IPV6"),
            LinkType(other) => write!(f, "LINKTYPE({})", other),
        }
    }
}

/// Everything the global header declares about a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub byte_order: ByteOrder,
    pub resolution: TsResolution,
    pub version_major: u16,
    pub version_minor: u16,
    /// GMT to local correction, always 0 in practice.
    pub thiszone: i32,
    pub sigfigs: u32,
    /// Maximum captured length per record; 0 means unlimited.
    pub snap_len: u32,
    pub link_type: LinkType,
}

impl FileMeta {
    /// Header for a new microsecond capture in native byte order.
    pub fn new(snap_len: u32, link_type: LinkType) -> Self {
        Self {
            byte_order: ByteOrder::native(),
            resolution: TsResolution::Micro,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            thiszone: 0,
            sigfigs: 0,
            snap_len,
            link_type,
        }
    }

    /// Whether a record of `captured` bytes fits the declared snap length.
    pub fn admits(&self, captured: u32) -> bool {
        self.snap_len == 0 || captured <= self.snap_len
    }

    /// Metadata of a header the codec parsed; only major version 2 is
    /// accepted.
    pub(crate) fn from_header(header: PcapHeader) -> Result<Self, FormatError> {
        if header.version_major != VERSION_MAJOR {
            return Err(FormatError::UnsupportedVersion {
                major: header.version_major,
                minor: header.version_minor,
            });
        }
        Ok(Self {
            byte_order: header.endianness.into(),
            resolution: header.ts_resolution.into(),
            version_major: header.version_major,
            version_minor: header.version_minor,
            thiszone: header.ts_correction,
            sigfigs: header.ts_accuracy,
            snap_len: header.snaplen,
            link_type: LinkType(u32::from(header.datalink)),
        })
    }

    pub(crate) fn to_header(self) -> PcapHeader {
        PcapHeader {
            version_major: self.version_major,
            version_minor: self.version_minor,
            ts_correction: self.thiszone,
            ts_accuracy: self.sigfigs,
            snaplen: self.snap_len,
            datalink: DataLink::from(self.link_type.0),
            ts_resolution: self.resolution.into(),
            endianness: self.byte_order.into(),
        }
    }
}

impl Default for FileMeta {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPLEN, LinkType::ETHERNET)
    }
}
