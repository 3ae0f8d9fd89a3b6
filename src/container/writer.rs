//! Sequential capture-file writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use pcap_file::pcap::PcapWriter;

use super::{CaptureRecord, FileMeta};
use crate::error::ContainerError;

/// Writes the global header on creation, then whole records.
///
/// The codec encodes into a scratch buffer that is handed to the stream in a
/// single `write_all`, so a failed write never leaves a record header
/// without its data.
pub struct CaptureWriter<W: Write> {
    inner: W,
    encoder: PcapWriter<Scratch>,
    scratch: Scratch,
    meta: FileMeta,
    records_written: u64,
}

/// Scratch buffer shared with the codec so its output can be read back
/// (pcap-file's `PcapWriter` exposes no accessor for its inner writer).
#[derive(Clone, Default)]
struct Scratch(Arc<Mutex<Vec<u8>>>);

impl Scratch {
    fn get_mut(&self) -> MutexGuard<'_, Vec<u8>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Write for Scratch {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.get_mut().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CaptureWriter<BufWriter<File>> {
    /// Create (or truncate) a capture file on disk.
    pub fn create<P: AsRef<Path>>(path: P, meta: FileMeta) -> Result<Self, ContainerError> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), meta)
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Write the global header for `meta` to `inner`.
    pub fn new(mut inner: W, meta: FileMeta) -> Result<Self, ContainerError> {
        let scratch = Scratch::default();
        let encoder = PcapWriter::with_header(scratch.clone(), meta.to_header())?;
        inner.write_all(&scratch.get_mut())?;
        scratch.get_mut().clear();
        Ok(Self {
            inner,
            encoder,
            scratch,
            meta,
            records_written: 0,
        })
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Append `record`; records larger than the snap length are refused.
    pub fn write_record(&mut self, record: &CaptureRecord) -> Result<(), ContainerError> {
        let packet = record.to_raw(&self.meta)?;
        self.scratch.get_mut().clear();
        self.encoder.write_raw_packet(&packet)?;
        self.inner.write_all(&self.scratch.get_mut())?;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ContainerError> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying stream.
    pub fn into_inner(mut self) -> Result<W, ContainerError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
