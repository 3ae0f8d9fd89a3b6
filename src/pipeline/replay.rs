//! Replay pipeline: a capture file back onto an interface.

use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::PipelineStats;
use crate::capture::{FrameSink, PnetCapture};
use crate::config::CaptureConfig;
use crate::container::{CaptureReader, LinkType};
use crate::error::PipelineError;

/// Frames between two progress messages.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Send every record of `reader` through `sink`, in file order.
///
/// Frames the sink rejects are logged and counted as dropped. Only Ethernet
/// captures can be replayed.
pub fn run_replay<R, K>(
    reader: &mut CaptureReader<R>,
    sink: &mut K,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError>
where
    R: Read,
    K: FrameSink + ?Sized,
{
    let link_type = reader.meta().link_type;
    if link_type != LinkType::ETHERNET {
        return Err(PipelineError::LinkTypeMismatch {
            capture: link_type,
            interface: LinkType::ETHERNET,
        });
    }

    let mut stats = PipelineStats::default();

    while running.load(Ordering::SeqCst) {
        let Some(record) = reader.read_record()? else {
            break;
        };
        stats.read += 1;

        if let Err(e) = sink.send_frame(record.data()) {
            tracing::warn!("Frame {}: {}", stats.read - 1, e);
            stats.dropped += 1;
            continue;
        }
        stats.written += 1;

        if stats.written % PROGRESS_INTERVAL == 0 {
            tracing::info!("Replayed {} packets so far...", stats.written);
        }
    }

    Ok(stats)
}

/// Replay `input` onto the interface named in `config`.
pub fn replay_file(
    config: &CaptureConfig,
    input: &Path,
    running: &AtomicBool,
) -> Result<PipelineStats, PipelineError> {
    let mut reader = CaptureReader::open(input)?;
    let mut sink = PnetCapture::open(config)?;

    tracing::info!(
        "Replaying {} on {}",
        input.display(),
        sink.interface_name()
    );
    let stats = run_replay(&mut reader, &mut sink, running)?;
    tracing::info!(
        "Replay complete. Total packets replayed: {} ({})",
        stats.written,
        stats
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::container::{CaptureRecord, CaptureWriter, FileMeta};
    use crate::error::CaptureError;

    #[derive(Default)]
    struct MockSink {
        sent: Vec<Vec<u8>>,
        /// Reject frames of exactly this length.
        reject_len: Option<usize>,
    }

    impl FrameSink for MockSink {
        fn send_frame(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
            if Some(frame.len()) == self.reject_len {
                return Err(CaptureError::Send(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "rejected",
                )));
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }

        fn interface_name(&self) -> &str {
            "mock0"
        }
    }

    fn capture(link_type: LinkType, lengths: &[usize]) -> CaptureReader<Cursor<Vec<u8>>> {
        let mut writer = CaptureWriter::new(Vec::new(), FileMeta::new(65535, link_type)).unwrap();
        for (i, len) in lengths.iter().enumerate() {
            writer
                .write_record(&CaptureRecord::from_frame(i as u32, 0, vec![i as u8; *len]))
                .unwrap();
        }
        CaptureReader::new(Cursor::new(writer.into_inner().unwrap())).unwrap()
    }

    #[test]
    fn sends_frames_in_order() {
        let mut reader = capture(LinkType::ETHERNET, &[60, 70, 80]);
        let mut sink = MockSink::default();
        let stats = run_replay(&mut reader, &mut sink, &AtomicBool::new(true)).unwrap();

        assert_eq!(stats.read, 3);
        assert_eq!(stats.written, 3);
        let lengths: Vec<usize> = sink.sent.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![60, 70, 80]);
    }

    #[test]
    fn send_failures_are_skipped() {
        let mut reader = capture(LinkType::ETHERNET, &[60, 70, 80]);
        let mut sink = MockSink {
            reject_len: Some(70),
            ..MockSink::default()
        };
        let stats = run_replay(&mut reader, &mut sink, &AtomicBool::new(true)).unwrap();

        assert_eq!(stats.written, 2);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn non_ethernet_capture_is_refused() {
        let mut reader = capture(LinkType::RAW, &[20]);
        let mut sink = MockSink::default();
        let result = run_replay(&mut reader, &mut sink, &AtomicBool::new(true));
        assert!(matches!(
            result,
            Err(PipelineError::LinkTypeMismatch { .. })
        ));
        assert!(sink.sent.is_empty());
    }
}
