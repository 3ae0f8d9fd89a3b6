//! Classic libpcap capture-container codec.
//!
//! A capture file is a 24-byte global header followed by records, each a
//! 16-byte record header and the captured frame bytes. The magic number
//! fixes the byte order and timestamp resolution for every field that
//! follows.
//!
//! Byte-level encoding is done by `pcap_file`; this module adds the
//! snap-length and original-length checks and keeps the header of an input
//! file so outputs can reproduce it.

mod header;
mod reader;
mod record;
mod writer;

pub use header::{ByteOrder, FileMeta, LinkType, TsResolution};
pub use reader::CaptureReader;
pub use record::CaptureRecord;
pub use writer::CaptureWriter;

/// Size of the global file header.
pub const FILE_HEADER_LEN: usize = 24;

/// Size of each record header.
pub const RECORD_HEADER_LEN: usize = 16;

/// Default snap length used by the capture tooling.
pub const DEFAULT_SNAPLEN: u32 = 65535;
