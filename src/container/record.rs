//! Per-frame records.

use std::borrow::Cow;

use pcap_file::pcap::RawPcapPacket;

use super::FileMeta;
use crate::error::FormatError;

/// One timestamped frame of a capture file.
///
/// Records are immutable: pipeline stages that change the frame bytes build
/// a new record with [`CaptureRecord::with_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    ts_sec: u32,
    ts_frac: u32,
    original_len: u32,
    data: Vec<u8>,
}

impl CaptureRecord {
    /// Build a record, checking that the captured bytes do not exceed the
    /// original frame length.
    pub fn new(
        ts_sec: u32,
        ts_frac: u32,
        original_len: u32,
        data: Vec<u8>,
    ) -> Result<Self, FormatError> {
        let captured = len_u32(&data);
        if captured > original_len {
            return Err(FormatError::ExceedsOriginalLen {
                captured,
                original: original_len,
            });
        }
        Ok(Self {
            ts_sec,
            ts_frac,
            original_len,
            data,
        })
    }

    /// Record of a complete, untruncated frame.
    pub fn from_frame(ts_sec: u32, ts_frac: u32, data: Vec<u8>) -> Self {
        Self {
            ts_sec,
            ts_frac,
            original_len: len_u32(&data),
            data,
        }
    }

    /// Record of a frame seen on the wire, truncated to `snap_len` bytes
    /// (0 keeps the whole frame).
    pub fn truncated(ts_sec: u32, ts_frac: u32, mut data: Vec<u8>, snap_len: u32) -> Self {
        let original_len = len_u32(&data);
        if snap_len != 0 && data.len() > snap_len as usize {
            data.truncate(snap_len as usize);
        }
        Self {
            ts_sec,
            ts_frac,
            original_len,
            data,
        }
    }

    pub fn ts_sec(&self) -> u32 {
        self.ts_sec
    }

    /// Sub-second part, in the unit of the file's
    /// [`TsResolution`](super::TsResolution).
    pub fn ts_frac(&self) -> u32 {
        self.ts_frac
    }

    pub fn captured_len(&self) -> u32 {
        len_u32(&self.data)
    }

    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// A record with the same timestamp carrying `data` instead.
    ///
    /// The original length moves by the same amount as the captured length,
    /// so a truncated frame stays marked as truncated.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        let missing = self.original_len - self.captured_len();
        let original_len = len_u32(&data).saturating_add(missing);
        Self {
            ts_sec: self.ts_sec,
            ts_frac: self.ts_frac,
            original_len,
            data,
        }
    }

    /// Record from a packet the codec parsed, checked against the limits of
    /// `meta`.
    pub(crate) fn from_raw(
        packet: RawPcapPacket<'_>,
        meta: &FileMeta,
    ) -> Result<Self, FormatError> {
        let captured = packet.incl_len;
        if !meta.admits(captured) {
            return Err(FormatError::ExceedsSnapLen {
                captured,
                snap_len: meta.snap_len,
            });
        }
        if captured > packet.orig_len {
            return Err(FormatError::ExceedsOriginalLen {
                captured,
                original: packet.orig_len,
            });
        }
        Ok(Self {
            ts_sec: packet.ts_sec,
            ts_frac: packet.ts_frac,
            original_len: packet.orig_len,
            data: packet.data.into_owned(),
        })
    }

    /// Borrowed codec view of the record, if it fits the limits of `meta`.
    pub(crate) fn to_raw(&self, meta: &FileMeta) -> Result<RawPcapPacket<'_>, FormatError> {
        let captured = self.captured_len();
        if !meta.admits(captured) {
            return Err(FormatError::ExceedsSnapLen {
                captured,
                snap_len: meta.snap_len,
            });
        }
        Ok(RawPcapPacket {
            ts_sec: self.ts_sec,
            ts_frac: self.ts_frac,
            incl_len: captured,
            orig_len: self.original_len,
            data: Cow::Borrowed(&self.data),
        })
    }
}

fn len_u32(data: &[u8]) -> u32 {
    u32::try_from(data.len()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::LinkType;

    fn raw(incl_len: u32, orig_len: u32) -> RawPcapPacket<'static> {
        RawPcapPacket {
            ts_sec: 1_700_000_000,
            ts_frac: 123_456,
            incl_len,
            orig_len,
            data: Cow::Owned(vec![0xab; incl_len as usize]),
        }
    }

    #[test]
    fn raw_packet_becomes_record() {
        let meta = FileMeta::new(128, LinkType::ETHERNET);
        let record = CaptureRecord::from_raw(raw(60, 90), &meta).unwrap();
        assert_eq!(record.ts_sec(), 1_700_000_000);
        assert_eq!(record.ts_frac(), 123_456);
        assert_eq!(record.captured_len(), 60);
        assert_eq!(record.original_len(), 90);

        let back = record.to_raw(&meta).unwrap();
        assert_eq!(back.incl_len, 60);
        assert_eq!(back.orig_len, 90);
        assert_eq!(&back.data[..], record.data());
    }

    #[test]
    fn rejects_captured_beyond_snap_len() {
        let meta = FileMeta::new(128, LinkType::ETHERNET);
        assert_eq!(
            CaptureRecord::from_raw(raw(200, 200), &meta),
            Err(FormatError::ExceedsSnapLen {
                captured: 200,
                snap_len: 128
            })
        );
        let record = CaptureRecord::from_frame(0, 0, vec![0; 129]);
        assert!(record.to_raw(&meta).is_err());
    }

    #[test]
    fn rejects_captured_beyond_original() {
        let meta = FileMeta::new(0, LinkType::ETHERNET);
        assert!(matches!(
            CaptureRecord::from_raw(raw(10, 4), &meta),
            Err(FormatError::ExceedsOriginalLen { .. })
        ));
    }

    #[test]
    fn new_rejects_captured_beyond_original() {
        assert!(CaptureRecord::new(0, 0, 3, vec![0; 4]).is_err());
    }

    #[test]
    fn truncated_keeps_original_length() {
        let record = CaptureRecord::truncated(5, 6, vec![7; 100], 64);
        assert_eq!(record.captured_len(), 64);
        assert_eq!(record.original_len(), 100);

        let whole = CaptureRecord::truncated(5, 6, vec![7; 100], 0);
        assert_eq!(whole.captured_len(), 100);
    }

    #[test]
    fn with_data_preserves_timestamp_and_truncation() {
        let record = CaptureRecord::new(10, 20, 100, vec![0; 64]).unwrap();
        let replaced = record.with_data(vec![1; 66]);
        assert_eq!(replaced.ts_sec(), 10);
        assert_eq!(replaced.ts_frac(), 20);
        assert_eq!(replaced.captured_len(), 66);
        assert_eq!(replaced.original_len(), 102);

        let whole = CaptureRecord::from_frame(1, 2, vec![0; 60]).with_data(vec![0; 60]);
        assert_eq!(whole.original_len(), 60);
    }
}
