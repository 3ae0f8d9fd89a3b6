//! Sequential capture-file reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use pcap_file::pcap::PcapReader;

use super::{CaptureRecord, FileMeta};
use crate::error::ContainerError;

/// Reads the global header once, then records in file order.
///
/// # Example
///
/// ```ignore
/// let mut reader = CaptureReader::open("capture.pcap")?;
/// while let Some(record) = reader.read_record()? {
///     println!("{} bytes", record.captured_len());
/// }
/// ```
pub struct CaptureReader<R: Read> {
    inner: PcapReader<R>,
    meta: FileMeta,
    records_read: u64,
}

impl CaptureReader<File> {
    /// Open a capture file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ContainerError> {
        let file = File::open(path.as_ref())?;
        Self::new(file)
    }
}

impl<R: Read> CaptureReader<R> {
    /// Parse the global header from `inner`.
    ///
    /// Both byte orders and both the microsecond and nanosecond magic are
    /// accepted; the major version must be 2.
    pub fn new(inner: R) -> Result<Self, ContainerError> {
        let inner = PcapReader::new(inner)?;
        let meta = FileMeta::from_header(inner.header())?;
        Ok(Self {
            inner,
            meta,
            records_read: 0,
        })
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    /// Number of records returned so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the next record; `Ok(None)` once the stream is exhausted at a
    /// record boundary.
    pub fn read_record(&mut self) -> Result<Option<CaptureRecord>, ContainerError> {
        let Some(packet) = self.inner.next_raw_packet() else {
            return Ok(None);
        };
        let record = CaptureRecord::from_raw(packet?, &self.meta)?;
        self.records_read += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<CaptureRecord, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
